//! Party quiz engine demo entrypoint: plays one configured game with a scripted player.

use std::sync::Arc;

use anyhow::Context;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use party_quiz_engine::{
    GameKind, Session, SessionStatus,
    config::AppConfig,
    dao::{
        content::{ContentCatalog, JsonDirProvider},
        records::{JsonFileRecordSink, RecordSink},
    },
    dto::snapshot::SessionSnapshot,
    games::{
        CaseDetective, ColorSequence, Dilemma, Estimation, Taboo, Trivia, TwoTruths, WhoAmI,
        case_detective::CaseAction,
        color_sequence::{Color, ColorAction, ColorPhase},
        dilemma::DilemmaAction,
        estimation::EstimationAction,
        taboo::TabooAction,
        trivia::TriviaAction,
        two_truths::TwoTruthsAction,
        who_am_i::WhoAmIAction,
    },
    services::driver,
    state::{GameRules, TickStream, tokio_scheduler_with_second},
};

/// Scripted moves before the demo ends the run itself.
const MAX_MOVES: usize = 60;
/// Chance that the scripted player gets an answer right.
const HIT_RATE: f64 = 0.7;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let catalog = ContentCatalog::new(Arc::new(JsonDirProvider::new(&config.content_dir)));
    let sink: Arc<dyn RecordSink> = Arc::new(JsonFileRecordSink::new(
        &config.records_path,
        config.max_records,
    ));
    info!(game = config.game.slug(), content_dir = %config.content_dir.display(), "starting demo");

    match config.game {
        GameKind::Taboo => {
            let (mut session, ticks) = prepare(Taboo::new(), &config, sink);
            load(&mut session, &catalog).await?;
            session.add_team("Red")?;
            session.add_team("Blue")?;
            play(session, ticks, &config, |_, rng| {
                Some(match rng.random_range(0..10) {
                    0 => TabooAction::Forbidden,
                    1 | 2 => TabooAction::Pass,
                    _ => TabooAction::Correct,
                })
            })
            .await
        }
        GameKind::WhoAmI => {
            let (mut session, ticks) = prepare(WhoAmI::default(), &config, sink);
            load(&mut session, &catalog).await?;
            play(session, ticks, &config, |_, rng| {
                Some(if rng.random_bool(HIT_RATE) {
                    WhoAmIAction::Correct
                } else {
                    WhoAmIAction::Pass
                })
            })
            .await
        }
        GameKind::Trivia => {
            let (mut session, ticks) = prepare(Trivia::default(), &config, sink);
            load(&mut session, &catalog).await?;
            play(session, ticks, &config, |snapshot, rng| {
                let options = &snapshot.view.options;
                let pick = pick_answer(options.iter().position(|option| option.correct), options.len(), rng)?;
                Some(TriviaAction::Select(pick))
            })
            .await
        }
        GameKind::CaseDetective => {
            let (mut session, ticks) = prepare(CaseDetective::default(), &config, sink);
            load(&mut session, &catalog).await?;
            let kind = session.content().first().map(|case| case.kind);
            session.update_settings(|settings| settings.kind = kind)?;
            play(session, ticks, &config, |snapshot, rng| {
                let case = snapshot.view.current.as_ref()?;
                let right = case.options.iter().position(|option| *option == case.correct_answer);
                Some(CaseAction::Answer(pick_answer(right, case.options.len(), rng)?))
            })
            .await
        }
        GameKind::TwoTruths => {
            let (mut session, ticks) = prepare(TwoTruths::default(), &config, sink);
            load(&mut session, &catalog).await?;
            play(session, ticks, &config, |snapshot, rng| {
                let statements = &snapshot.view.statements;
                let lie = statements.iter().position(|statement| !statement.truth);
                Some(TwoTruthsAction::Select(pick_answer(lie, statements.len(), rng)?))
            })
            .await
        }
        GameKind::Estimation => {
            let (mut session, ticks) = prepare(Estimation::default(), &config, sink);
            load(&mut session, &catalog).await?;
            play(session, ticks, &config, |snapshot, rng| {
                let question = snapshot.view.question.as_ref()?;
                if question.min >= question.max {
                    return Some(EstimationAction::Guess(question.min));
                }
                Some(EstimationAction::Guess(rng.random_range(question.min..=question.max)))
            })
            .await
        }
        GameKind::ColorSequence => {
            let (mut session, ticks) = prepare(ColorSequence::default(), &config, sink);
            if let Err(err) = load(&mut session, &catalog).await {
                warn!(error = %err, "no color palette on disk; using the default pads");
                session = session.with_default_palette();
            }
            play(session, ticks, &config, |snapshot, rng| {
                let view = &snapshot.view;
                if view.phase != ColorPhase::Recall {
                    return None;
                }
                let expected = *view.sequence.get(view.input.len())?;
                let color = if rng.random_bool(0.9) {
                    expected
                } else {
                    Color::ALL[rng.random_range(0..Color::ALL.len())]
                };
                Some(ColorAction::Select(color))
            })
            .await
        }
        GameKind::Dilemma => {
            let (mut session, ticks) = prepare(Dilemma::default(), &config, sink);
            load(&mut session, &catalog).await?;
            play(session, ticks, &config, |snapshot, _| {
                Some(if snapshot.view.show_discussion {
                    DilemmaAction::NextCase
                } else {
                    DilemmaAction::ToggleDiscussion
                })
            })
            .await
        }
    }
}

/// Build a session ticking on the tokio runtime and saving its record to `sink`.
fn prepare<G: GameRules>(rules: G, config: &AppConfig, sink: Arc<dyn RecordSink>) -> (Session<G>, TickStream) {
    let (scheduler, ticks) = tokio_scheduler_with_second(config.tick_interval);
    let session = Session::with_scheduler(rules, Box::new(scheduler)).with_record_sink(sink);
    (session, ticks)
}

async fn load<G: GameRules>(session: &mut Session<G>, catalog: &ContentCatalog) -> anyhow::Result<()> {
    let items = session
        .load_content(catalog)
        .await
        .with_context(|| format!("loading content for {}", G::KIND.label()))?;
    debug!(game = G::KIND.slug(), items, "content ready");
    Ok(())
}

/// Right answer with [`HIT_RATE`] probability, a random one otherwise.
fn pick_answer(right: Option<usize>, len: usize, rng: &mut StdRng) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match right {
        Some(index) if rng.random_bool(HIT_RATE) => Some(index),
        _ => Some(rng.random_range(0..len)),
    }
}

/// Drive `session` to completion with moves chosen by `script`.
async fn play<G, F>(session: Session<G>, ticks: TickStream, config: &AppConfig, mut script: F) -> anyhow::Result<()>
where
    G: GameRules,
    F: FnMut(&SessionSnapshot<G::Settings, G::View>, &mut StdRng) -> Option<G::Action>,
{
    let (handle, task) = driver::spawn(session, Some(ticks));
    let mut changes = handle.changes();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let version = *changes.borrow_and_update();
            trace!(version, "session changed");
        }
    });
    handle.start().await.context("starting session")?;
    let mut rng = StdRng::from_os_rng();

    for _ in 0..MAX_MOVES {
        sleep(config.action_interval).await;
        let snapshot = handle.snapshot().await?;
        match snapshot.status {
            SessionStatus::Finished => break,
            SessionStatus::RevealingAnswer | SessionStatus::AwaitingTransition => {
                handle.advance().await?;
            }
            SessionStatus::Playing => {
                if let Some(action) = script(&snapshot, &mut rng) {
                    debug!(?action, time_left = snapshot.time_left, "scripted move");
                    handle.act(action).await?;
                }
            }
            SessionStatus::Idle | SessionStatus::Paused => {}
        }
    }

    if !handle.snapshot().await?.is_finished() {
        handle.end().await?;
    }
    let snapshot = handle.snapshot().await?;
    info!(
        game = G::KIND.slug(),
        reason = ?snapshot.finish_reason,
        score = snapshot.progress.score,
        answered = snapshot.progress.answered,
        "demo finished"
    );

    handle.shutdown().await;
    task.await.context("session driver task failed")?;
    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,party_quiz_engine=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
