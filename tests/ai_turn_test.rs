//! Tests for the AI turn: single flight, failure handling, retries, and
//! abandoning a turn on reset.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use strictly_chess::{
    AiPhase, AiTurnError, AiTurnOutcome, CastlingRights, ChessSession, Color, GameMode, GameResult,
    MoveSuggestionProvider, Mover, PieceKind, Position, RulesError, RulesProvider, SessionEvent,
    SessionOptions, ShakmatyRules, SuggestionError,
};
use tokio::sync::{Notify, mpsc};

/// Suggester that replays canned answers.
#[derive(Default)]
struct ScriptedSuggester {
    answers: Mutex<VecDeque<Result<String, SuggestionError>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    delay: Option<Duration>,
}

impl ScriptedSuggester {
    fn answering(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| Ok(a.to_string())).collect()),
            ..Self::default()
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MoveSuggestionProvider for ScriptedSuggester {
    async fn suggest_move(&self, _position: &str) -> Result<String, SuggestionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.answers.lock().expect("answers lock").pop_front();
        next.unwrap_or_else(|| Err(SuggestionError::new("script exhausted")))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Suggester that waits on a gate and records how many calls overlap.
struct OverlapCounter {
    gate: Arc<Notify>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Decrements the in-flight count when a call finishes or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl OverlapCounter {
    fn new(gate: Arc<Notify>) -> Self {
        Self {
            gate,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MoveSuggestionProvider for OverlapCounter {
    async fn suggest_move(&self, _position: &str) -> Result<String, SuggestionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);
        self.gate.notified().await;
        Ok("e4".to_string())
    }

    fn name(&self) -> &str {
        "overlap-counter"
    }
}

/// Standard rules whose every move attempt fails.
struct BrokenEngine(ShakmatyRules);

impl RulesProvider for BrokenEngine {
    fn current_position(&self) -> String {
        self.0.current_position()
    }

    fn legal_moves_from(&self, square: &str) -> Vec<String> {
        self.0.legal_moves_from(square)
    }

    fn apply_move(
        &mut self,
        _from: &str,
        _to: &str,
        _promotion: Option<PieceKind>,
    ) -> Result<String, RulesError> {
        Err(RulesError::new("engine crashed"))
    }

    fn resolve_notation(&self, san: &str) -> Result<(String, String), RulesError> {
        self.0.resolve_notation(san)
    }

    fn turn_to_move(&self) -> Color {
        self.0.turn_to_move()
    }

    fn is_checkmate(&self) -> bool {
        self.0.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.0.is_stalemate()
    }

    fn is_draw(&self) -> bool {
        self.0.is_draw()
    }

    fn is_threefold_repetition(&self) -> bool {
        self.0.is_threefold_repetition()
    }

    fn is_insufficient_material(&self) -> bool {
        self.0.is_insufficient_material()
    }

    fn castling_rights(&self, color: Color) -> CastlingRights {
        self.0.castling_rights(color)
    }

    fn move_history(&self) -> Vec<String> {
        self.0.move_history()
    }

    fn reset(&mut self) {
        self.0.reset();
    }
}

fn sq(name: &str) -> Position {
    Position::from_algebraic(name).expect("valid square")
}

fn ai_plays(color: Color) -> SessionOptions {
    SessionOptions::default().with_mode(GameMode::PlayerVsAi { ai_color: color })
}

fn session_with(
    options: SessionOptions,
    suggester: Arc<dyn MoveSuggestionProvider>,
) -> (ChessSession, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = ChessSession::new(ShakmatyRules::new(), options, tx)
        .expect("session")
        .with_suggester(suggester);
    (session, rx)
}

/// Collects events until the AI stops thinking.
async fn until_idle(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("AI turn finished")
            .expect("channel open");
        let done = matches!(event, SessionEvent::AiThinking(false));
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Lets spawned tasks run until the suggester has been called `n` times.
async fn until_called(suggester: &OverlapCounter, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while suggester.calls() < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("suggester called");
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_human_move_triggers_ai_reply() {
    let suggester = Arc::new(ScriptedSuggester::answering(&["Move: e5"]));
    let (session, mut rx) = session_with(ai_plays(Color::Black), suggester.clone());

    let state = session.submit_move(sq("e2"), sq("e4")).expect("legal");
    assert_eq!(*state.turn(), Color::Black);

    let events = until_idle(&mut rx).await;
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::MoveMade { mover: Mover::Ai, notation, .. } if notation == "e5"
    )));

    let state = session.snapshot();
    assert_eq!(state.move_history(), &["e4", "e5"]);
    assert_eq!(*state.turn(), Color::White);
    assert!(!session.is_ai_thinking());
    assert_eq!(session.ai_phase(), AiPhase::Idle);
    assert_eq!(suggester.calls(), 1);
}

#[tokio::test]
async fn test_single_request_in_flight() {
    let gate = Arc::new(Notify::new());
    let suggester = Arc::new(ScriptedSuggester::answering(&["e4"]).gated(gate.clone()));
    let (session, _rx) = session_with(ai_plays(Color::White), suggester.clone());

    let handle = session.request_ai_move().expect("AI to move");
    assert!(session.is_ai_thinking());
    assert!(session.request_ai_move().is_none());
    assert!(session.select_square(sq("d2")).is_empty());

    gate.notify_one();
    let outcome = handle.await.expect("task");
    assert!(matches!(outcome, AiTurnOutcome::Applied(_)));
    assert_eq!(suggester.calls(), 1);
    assert_eq!(session.snapshot().move_history(), &["e4"]);
}

#[tokio::test]
async fn test_no_request_when_human_to_move() {
    let suggester = Arc::new(ScriptedSuggester::answering(&["e4"]));
    let (session, _rx) = session_with(ai_plays(Color::Black), suggester.clone());

    assert!(session.request_ai_move().is_none());
    assert!(!session.is_ai_thinking());
    assert_eq!(suggester.calls(), 0);
}

#[tokio::test]
async fn test_unparsable_answer_fails_turn() {
    let suggester = Arc::new(ScriptedSuggester::answering(&[
        "I think I would rather resign here",
    ]));
    let (session, mut rx) = session_with(ai_plays(Color::White), suggester);

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    assert!(matches!(
        outcome,
        AiTurnOutcome::Failed(AiTurnError::Unparsable(_))
    ));

    let events = drain(&mut rx);
    assert!(matches!(
        events.as_slice(),
        [
            SessionEvent::AiThinking(true),
            SessionEvent::AiUnavailable(AiTurnError::Unparsable(_)),
            SessionEvent::AiThinking(false),
        ]
    ));
    assert!(session.snapshot().move_history().is_empty());
    assert_eq!(session.ai_phase(), AiPhase::Idle);
}

#[tokio::test]
async fn test_provider_error_fails_turn() {
    let suggester = Arc::new(ScriptedSuggester {
        answers: Mutex::new(VecDeque::from([Err(SuggestionError::new("rate limited"))])),
        ..ScriptedSuggester::default()
    });
    let (session, _rx) = session_with(ai_plays(Color::White), suggester);

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    assert!(matches!(
        outcome,
        AiTurnOutcome::Failed(AiTurnError::ProviderUnavailable(_))
    ));
    assert!(!session.is_ai_thinking());
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let suggester = Arc::new(ScriptedSuggester::answering(&["e4"]).delayed(Duration::from_secs(5)));
    let options = ai_plays(Color::White).with_suggestion_timeout(Duration::from_millis(20));
    let (session, _rx) = session_with(options, suggester);

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    assert!(matches!(
        outcome,
        AiTurnOutcome::Failed(AiTurnError::Timeout(limit)) if limit == Duration::from_millis(20)
    ));
    assert!(session.snapshot().move_history().is_empty());
    assert!(!session.is_ai_thinking());
}

#[tokio::test]
async fn test_hallucinated_move_rejected() {
    let suggester = Arc::new(ScriptedSuggester::answering(&["Move: Qh5"]));
    let (session, _rx) = session_with(ai_plays(Color::White), suggester);
    let before = session.snapshot();

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    match outcome {
        AiTurnOutcome::Failed(AiTurnError::IllegalSuggestion { notation, .. }) => {
            assert_eq!(notation, "Qh5");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(*session.snapshot(), *before);
}

#[tokio::test]
async fn test_bad_answer_retried_within_turn() {
    let suggester = Arc::new(ScriptedSuggester::answering(&["Qh5", "Best move: Nf3"]));
    let options = ai_plays(Color::White).with_max_suggestion_attempts(2);
    let (session, mut rx) = session_with(options, suggester.clone());

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    assert!(matches!(outcome, AiTurnOutcome::Applied(_)));
    assert_eq!(suggester.calls(), 2);
    assert_eq!(session.snapshot().move_history(), &["Nf3"]);

    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::AiUnavailable(_))));
}

#[tokio::test]
async fn test_provider_error_not_retried() {
    let suggester = Arc::new(ScriptedSuggester {
        answers: Mutex::new(VecDeque::from([
            Err(SuggestionError::new("overloaded")),
            Ok("e4".to_string()),
        ])),
        ..ScriptedSuggester::default()
    });
    let options = ai_plays(Color::White).with_max_suggestion_attempts(3);
    let (session, _rx) = session_with(options, suggester.clone());

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    assert!(matches!(outcome, AiTurnOutcome::Failed(_)));
    assert_eq!(suggester.calls(), 1);
}

#[tokio::test]
async fn test_reset_abandons_ai_turn() {
    let gate = Arc::new(Notify::new());
    let suggester = Arc::new(ScriptedSuggester::answering(&["e4"]).gated(gate.clone()));
    let (session, mut rx) = session_with(ai_plays(Color::White), suggester);

    let handle = session.request_ai_move().expect("AI to move");
    session.reset().expect("reset");
    assert!(!session.is_ai_thinking());
    assert_eq!(session.generation(), 1);

    gate.notify_one();
    let err = handle.await.expect_err("task aborted");
    assert!(err.is_cancelled());

    let state = session.snapshot();
    assert!(state.move_history().is_empty());
    assert_eq!(*state.turn(), Color::White);
    assert!(!session.is_ai_thinking());

    let events = drain(&mut rx);
    assert!(matches!(
        events.as_slice(),
        [
            SessionEvent::AiThinking(true),
            SessionEvent::AiThinking(false),
            SessionEvent::Reset { generation: 1 },
        ]
    ));
}

#[tokio::test]
async fn test_reset_leaves_one_request_outstanding() {
    let gate = Arc::new(Notify::new());
    let suggester = Arc::new(OverlapCounter::new(gate.clone()));
    let (session, mut rx) = session_with(ai_plays(Color::White), suggester.clone());

    let first = session.request_ai_move().expect("AI to move");
    until_called(&suggester, 1).await;
    assert_eq!(suggester.in_flight(), 1);

    session.reset().expect("reset");
    let err = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("abandoned task settles")
        .expect_err("task aborted");
    assert!(err.is_cancelled());
    assert_eq!(suggester.in_flight(), 0);

    let second = session.request_ai_move().expect("AI to move after reset");
    until_called(&suggester, 2).await;
    assert_eq!(suggester.in_flight(), 1);
    assert_eq!(suggester.peak(), 1);

    gate.notify_one();
    let outcome = second.await.expect("task");
    assert!(matches!(outcome, AiTurnOutcome::Applied(_)));
    assert_eq!(session.snapshot().move_history(), &["e4"]);
    assert_eq!(suggester.peak(), 1);

    let events = drain(&mut rx);
    assert!(matches!(
        events.as_slice(),
        [
            SessionEvent::AiThinking(true),
            SessionEvent::AiThinking(false),
            SessionEvent::Reset { generation: 1 },
            SessionEvent::AiThinking(true),
            SessionEvent::MoveMade { mover: Mover::Ai, .. },
            SessionEvent::AiThinking(false),
        ]
    ));
}

#[tokio::test]
async fn test_rules_fault_not_retried() {
    let suggester = Arc::new(ScriptedSuggester::answering(&["e4", "e4", "e4"]));
    let options = ai_plays(Color::White).with_max_suggestion_attempts(3);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = ChessSession::new(BrokenEngine(ShakmatyRules::new()), options, tx)
        .expect("session")
        .with_suggester(suggester.clone());

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    match outcome {
        AiTurnOutcome::Failed(e @ AiTurnError::RulesUnavailable(_)) => {
            assert!(!e.is_retryable());
            assert!(std::error::Error::source(&e).is_some());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(suggester.calls(), 1);
    assert!(session.snapshot().move_history().is_empty());
    assert!(!session.is_ai_thinking());

    let events = drain(&mut rx);
    assert!(matches!(
        events.as_slice(),
        [
            SessionEvent::AiThinking(true),
            SessionEvent::AiUnavailable(AiTurnError::RulesUnavailable(_)),
            SessionEvent::AiThinking(false),
        ]
    ));
}

#[tokio::test]
async fn test_missing_suggester_fails_turn() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let session =
        ChessSession::new(ShakmatyRules::new(), ai_plays(Color::White), tx).expect("session");

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    assert!(matches!(
        outcome,
        AiTurnOutcome::Failed(AiTurnError::ProviderUnavailable(_))
    ));
}

#[tokio::test]
async fn test_ai_delivers_mate() {
    let suggester = Arc::new(ScriptedSuggester::answering(&["e5", "Qh4#"]));
    let (session, mut rx) = session_with(ai_plays(Color::Black), suggester);

    session.submit_move(sq("f2"), sq("f3")).expect("legal");
    until_idle(&mut rx).await;
    session.submit_move(sq("g2"), sq("g4")).expect("legal");
    let events = until_idle(&mut rx).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::GameOver(GameResult::BlackWins))));
    assert_eq!(*session.snapshot().game_result(), GameResult::BlackWins);
    assert!(session.request_ai_move().is_none());
}
