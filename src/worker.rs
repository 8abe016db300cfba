use crate::config::ScoringConfig;
use crate::dataset::{FacilityRecord, PlanRecord};
use crate::scoring::{self, AuthorityScorecard, ScoreInputs};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio::task::yield_now;
use tracing::{info, warn};

/// One scoring run: datasets, the injected scoring payload, and the mode.
#[derive(Debug, Clone)]
pub struct ScoreRequest {
    pub inputs: ScoreInputs,
    pub config: ScoringConfig,
    pub mode: ScoreMode,
}

#[derive(Debug, Clone)]
pub enum ScoreMode {
    Single {
        authority: String,
        exclude_private: bool,
    },
    /// Sweeps the configured roster (or the override); the private-owner
    /// exclusion is always applied in bulk runs.
    Bulk {
        roster_override: Option<Vec<String>>,
    },
}

/// Messages streamed back to the caller. Every run ends with exactly one
/// terminal event (`Done`, `BatchDone`, or `Failed`), always last.
#[derive(Debug, Clone)]
pub enum ScoreEvent {
    Progress(String),
    Partial(BulkRow),
    Done(Box<AuthorityScorecard>),
    BatchDone {
        rows: Vec<BulkRow>,
        exceptions: Box<BulkExceptions>,
    },
    Failed(String),
}

/// One line of the bulk results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkRow {
    pub authority: String,
    pub plan: f64,
    pub maintenance: f64,
    pub ordinance: f64,
    pub total: f64,
}

impl From<&AuthorityScorecard> for BulkRow {
    fn from(card: &AuthorityScorecard) -> Self {
        Self {
            authority: card.authority.clone(),
            plan: card.plan.score,
            maintenance: card.maintenance.score,
            ordinance: card.ordinance.score,
            total: card.total(),
        }
    }
}

/// Exception rows accumulated across a bulk sweep, keyed by authority
/// within each category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkExceptions {
    pub plan_missed: BTreeMap<String, Vec<PlanRecord>>,
    pub group_included: BTreeMap<String, Vec<FacilityRecord>>,
    pub group_excluded: BTreeMap<String, Vec<FacilityRecord>>,
    pub grade_passed: BTreeMap<String, Vec<FacilityRecord>>,
    pub grade_failed: BTreeMap<String, Vec<FacilityRecord>>,
}

impl BulkExceptions {
    fn absorb(&mut self, card: &AuthorityScorecard) {
        let authority = card.authority.clone();
        self.plan_missed
            .insert(authority.clone(), card.plan.missed.clone());
        self.group_included
            .insert(authority.clone(), card.maintenance.included.clone());
        self.group_excluded
            .insert(authority.clone(), card.maintenance.excluded.clone());
        self.grade_passed
            .insert(authority.clone(), card.maintenance.passed.clone());
        self.grade_failed
            .insert(authority, card.maintenance.failed.clone());
    }
}

struct Submission {
    request: ScoreRequest,
    events: mpsc::UnboundedSender<ScoreEvent>,
}

/// Handle to the dedicated scoring task. Requests are fire-and-forget and
/// processed strictly one at a time; dropping the handle tears the task
/// down, discarding any queued work.
pub struct ScoringWorker {
    commands: mpsc::UnboundedSender<Submission>,
}

impl ScoringWorker {
    pub fn spawn() -> Self {
        let (commands, mut inbox) = mpsc::unbounded_channel::<Submission>();
        tokio::spawn(async move {
            while let Some(Submission { request, events }) = inbox.recv().await {
                run_request(request, &events).await;
            }
        });
        Self { commands }
    }

    pub fn submit(&self, request: ScoreRequest) -> mpsc::UnboundedReceiver<ScoreEvent> {
        let (events, stream) = mpsc::unbounded_channel();
        if let Err(rejected) = self.commands.send(Submission { request, events }) {
            let _ = rejected
                .0
                .events
                .send(ScoreEvent::Failed("scoring worker is gone".to_string()));
        }
        stream
    }
}

async fn run_request(request: ScoreRequest, events: &mpsc::UnboundedSender<ScoreEvent>) {
    let ScoreRequest {
        inputs,
        config,
        mode,
    } = request;

    match mode {
        ScoreMode::Single {
            authority,
            exclude_private,
        } => run_single(&inputs, &config, &authority, exclude_private, events).await,
        ScoreMode::Bulk { roster_override } => {
            run_bulk(&inputs, &config, roster_override, events).await
        }
    }
}

async fn run_single(
    inputs: &ScoreInputs,
    config: &ScoringConfig,
    authority: &str,
    exclude_private: bool,
    events: &mpsc::UnboundedSender<ScoreEvent>,
) {
    progress(events, "preparing management plan submissions");
    let plan = scoring::score_plan(&inputs.plans, authority, exclude_private, config);
    progress(events, "plan submission timeliness scored");
    yield_now().await;

    progress(events, "resolving rule sheets and facility records");
    let maintenance = match scoring::score_maintenance(
        &inputs.rule_book,
        &inputs.facilities,
        authority,
        exclude_private,
        config,
    ) {
        Ok(outcome) => outcome,
        Err(error) => {
            let _ = events.send(ScoreEvent::Failed(error.to_string()));
            return;
        }
    };
    progress(events, "maintenance target attainment scored");
    yield_now().await;

    progress(events, "preparing reserve-fund ordinances");
    let ordinance = scoring::score_ordinance(&inputs.ordinances, authority);
    progress(events, "reserve-fund ordinance enactment scored");

    let _ = events.send(ScoreEvent::Done(Box::new(AuthorityScorecard {
        authority: authority.to_string(),
        plan,
        maintenance,
        ordinance,
    })));
}

async fn run_bulk(
    inputs: &ScoreInputs,
    config: &ScoringConfig,
    roster_override: Option<Vec<String>>,
    events: &mpsc::UnboundedSender<ScoreEvent>,
) {
    let roster = roster_override.unwrap_or_else(|| config.roster.clone());
    let total = roster.len();
    let mut rows = Vec::new();
    let mut exceptions = BulkExceptions::default();

    for (position, authority) in roster.iter().enumerate() {
        progress(
            events,
            format!("[{}/{}] scoring {}", position + 1, total, authority),
        );
        yield_now().await;

        match scoring::score_authority(inputs, config, authority, true) {
            Ok(card) => {
                let row = BulkRow::from(&card);
                let _ = events.send(ScoreEvent::Partial(row.clone()));
                exceptions.absorb(&card);
                rows.push(row);
            }
            Err(error) => {
                warn!("skipping {authority}: {error}");
            }
        }
    }

    info!("bulk sweep finished with {} of {} authorities scored", rows.len(), total);
    let _ = events.send(ScoreEvent::BatchDone {
        rows,
        exceptions: Box::new(exceptions),
    });
}

fn progress(events: &mpsc::UnboundedSender<ScoreEvent>, message: impl Into<String>) {
    let _ = events.send(ScoreEvent::Progress(message.into()));
}
