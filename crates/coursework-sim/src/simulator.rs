//! Randomized session driver
//!
//! Builds a random assignment, drives a live [`AssignmentSession`] with
//! random edits, uploads, deletes, retries and downloads against
//! [`SimService`], and checks invariants after every operation and once the
//! session is at rest. Everything derives from one seed.
//!
//! Run on a current-thread runtime so that reading the published tree and
//! issuing the next operation cannot interleave with the dispatcher.

use crate::invariants::{check_at_rest, check_tree, is_at_rest, InvariantViolation};
use crate::service::SimService;
use coursework_model::{
    AssignmentId, AssignmentSnapshot, FileMeta, PartId, PartSnapshot, SaveStatus, TextBoxId,
    TextBoxSnapshot, UploadSlotId, UploadSlotSnapshot,
};
use coursework_sync::{
    AssignmentRef, AssignmentSession, SessionError, SyncConfig, UploadFile,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Operations to issue
    pub operations: u64,
    /// Probability that a backend call fails
    pub failure_rate: f64,
    /// Upper bound of backend latency
    pub max_latency_ms: u64,
    /// Debounce window handed to the session
    pub debounce_ms: u64,
    /// Upload cap handed to the session
    pub max_upload_bytes: u64,
    /// Stop issuing operations once a violation is found
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            operations: 500,
            failure_rate: 0.1,
            max_latency_ms: 20,
            debounce_ms: 15,
            max_upload_bytes: 4096,
            stop_on_first_violation: true,
        }
    }
}

/// An operation issued against the session
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SimulatedOperation {
    /// Type into a text box
    Edit { text_box: TextBoxId, text: String },
    /// Save a text box's draft now
    Retry { text_box: TextBoxId },
    /// Upload a catalog file of `size` bytes
    Upload { slot: UploadSlotId, name: String, size: u64 },
    /// Delete a slot's file
    Delete { slot: UploadSlotId },
    /// Download a slot's file
    Download { slot: UploadSlotId },
    /// Reset the form to pristine
    MarkPristine,
    /// Let time pass
    Pause { millis: u64 },
}

impl SimulatedOperation {
    /// Short name for statistics
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Edit { .. } => "edit",
            Self::Retry { .. } => "retry",
            Self::Upload { .. } => "upload",
            Self::Delete { .. } => "delete",
            Self::Download { .. } => "download",
            Self::MarkPristine => "mark-pristine",
            Self::Pause { .. } => "pause",
        }
    }
}

/// A violation detected during simulation
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    /// Session accepted what should be rejected, or the reverse
    UnexpectedOutcome {
        operation_index: u64,
        operation: SimulatedOperation,
        expected_accepted: bool,
        actual: String,
    },
    /// Invariant failed after an operation, or at rest when the index is absent
    Invariant {
        operation_index: Option<u64>,
        violation: InvariantViolation,
    },
    /// Outstanding work never finished
    NeverSettled,
    /// Session could not be opened
    Load { message: String },
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatorStats {
    /// Operations issued
    pub total_operations: u64,
    /// Operations the session accepted
    pub accepted: u64,
    /// Operations the session rejected
    pub rejected: u64,
    /// Backend calls that failed on purpose
    pub injected_failures: u64,
    /// Notices received, including lagged ones
    pub notices: u64,
    /// Operation counts by name
    pub operations_by_type: BTreeMap<String, u64>,
}

impl SimulatorStats {
    fn record(&mut self, operation: &SimulatedOperation, accepted: bool) {
        self.total_operations += 1;
        *self
            .operations_by_type
            .entry(operation.name().to_string())
            .or_insert(0) += 1;
        if accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    /// Configuration the run used
    pub config: SimulatorConfig,
    /// Collected statistics
    pub stats: SimulatorStats,
    /// Everything that went wrong
    pub violations: Vec<Violation>,
    /// Assignment status once at rest
    pub final_status: Option<SaveStatus>,
    /// Assignment completeness once at rest
    pub final_complete: Option<bool>,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== Coursework Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Operations: {}", self.stats.total_operations);
        let _ = writeln!(report, "Accepted: {}", self.stats.accepted);
        let _ = writeln!(report, "Rejected: {}", self.stats.rejected);
        let _ = writeln!(report, "Injected failures: {}", self.stats.injected_failures);
        let _ = writeln!(report, "Notices: {}", self.stats.notices);
        for (kind, count) in &self.stats.operations_by_type {
            let _ = writeln!(report, "  {kind}: {count}");
        }
        if let (Some(status), Some(complete)) = (self.final_status, self.final_complete) {
            let _ = writeln!(report, "Final status: {status} (complete: {complete})");
        }
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            let _ = writeln!(report, "\n=== Violations ===");
            for (i, violation) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {violation:?}", i + 1);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    /// Never in practice; every field serializes.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result of running many seeds
#[derive(Debug, Clone, Serialize)]
pub struct CertificationReport {
    /// Seeds run
    pub seeds_tested: u64,
    /// Seeds with at least one violation
    pub failed_seeds: Vec<u64>,
    /// Violations across all seeds
    pub total_violations: usize,
}

impl CertificationReport {
    /// Check if every seed passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failed_seeds.is_empty()
    }
}

/// Run one simulation per seed in `seeds`
pub async fn run_certification(seeds: Range<u64>, base: SimulatorConfig) -> CertificationReport {
    let mut report = CertificationReport {
        seeds_tested: 0,
        failed_seeds: Vec::new(),
        total_violations: 0,
    };
    for seed in seeds {
        let run = run_simulator(SimulatorConfig {
            seed,
            ..base.clone()
        })
        .await;
        report.seeds_tested += 1;
        report.total_violations += run.violations.len();
        if !run.passed() {
            report.failed_seeds.push(seed);
        }
    }
    report
}

/// Files the simulator picks from, with the accept-list that admits each
const CATALOG: [(&str, &str); 4] = [
    ("essay.pdf", "application/pdf"),
    ("scan.PNG", "image/png"),
    ("notes.txt", "text/plain"),
    ("data.csv", "text/csv"),
];

/// Accept-lists assigned to slots
const ACCEPT_LISTS: [&[&str]; 3] = [&[], &[".pdf"], &["image/*"]];

/// `ACCEPTS[list][file]`
const ACCEPTS: [[bool; 4]; 3] = [
    [true, true, true, true],
    [true, false, false, false],
    [false, true, false, false],
];

const ALPHABET: [char; 6] = ['a', 'b', 'z', ' ', 'é', '日'];

struct Layout {
    text_boxes: Vec<TextBoxId>,
    slots: Vec<UploadSlotId>,
    accept_list: HashMap<UploadSlotId, usize>,
}

/// Run the simulator
pub async fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();

    let (snapshot, layout) = generate_assignment(&mut rng);
    let backend = Arc::new(SimService::new(
        snapshot.clone(),
        config.seed.wrapping_add(1),
        config.failure_rate,
        config.max_latency_ms,
    ));
    let sync_config = SyncConfig::default()
        .with_debounce(Duration::from_millis(config.debounce_ms))
        .with_max_upload_bytes(config.max_upload_bytes);
    let target = AssignmentRef::new("simulated-course", snapshot.id);

    let session = match AssignmentSession::load(backend.clone(), target, sync_config).await {
        Ok(session) => session,
        Err(err) => {
            violations.push(Violation::Load {
                message: err.to_string(),
            });
            return SimulatorReport {
                config,
                stats,
                violations,
                final_status: None,
                final_complete: None,
            };
        }
    };
    let mut notices = session.notices();
    info!(
        seed = config.seed,
        text_boxes = layout.text_boxes.len(),
        slots = layout.slots.len(),
        "simulation started"
    );

    for index in 0..config.operations {
        let operation = generate_operation(&mut rng, &layout, &config);
        let expected = expected_acceptance(&session, &layout, &operation, &config);
        let outcome = execute(&session, &operation).await;
        let accepted = outcome.is_ok();
        // only input checks may reject; unknown leaves or a closed session are bugs
        let foreign_rejection = matches!(&outcome, Err(err) if !err.is_validation());

        if accepted != expected || foreign_rejection {
            warn!(index, operation = operation.name(), "unexpected outcome");
            violations.push(Violation::UnexpectedOutcome {
                operation_index: index,
                operation: operation.clone(),
                expected_accepted: expected,
                actual: match &outcome {
                    Ok(()) => "accepted".to_string(),
                    Err(err) => err.to_string(),
                },
            });
        }
        stats.record(&operation, accepted);

        tokio::task::yield_now().await;
        for violation in check_tree(&session.tree()) {
            warn!(index, check = ?violation.check, "invariant violated");
            violations.push(Violation::Invariant {
                operation_index: Some(index),
                violation,
            });
        }

        if config.stop_on_first_violation && !violations.is_empty() {
            break;
        }
    }

    // every debounce timer has fired after this
    tokio::time::sleep(Duration::from_millis(
        config.debounce_ms + config.max_latency_ms + 10,
    ))
    .await;
    let mut trees = session.subscribe();
    let settled = matches!(
        tokio::time::timeout(Duration::from_secs(30), trees.wait_for(is_at_rest)).await,
        Ok(Ok(_))
    );
    let tree = session.tree();
    if settled {
        for violation in check_at_rest(&tree, &backend) {
            warn!(check = ?violation.check, "invariant violated at rest");
            violations.push(Violation::Invariant {
                operation_index: None,
                violation,
            });
        }
    } else {
        violations.push(Violation::NeverSettled);
    }

    loop {
        match notices.try_recv() {
            Ok(_) => stats.notices += 1,
            Err(TryRecvError::Lagged(skipped)) => stats.notices += skipped,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    stats.injected_failures = backend.injected_failures();
    session.shutdown().await;

    info!(
        seed = config.seed,
        violations = violations.len(),
        status = %tree.save_status(),
        "simulation finished"
    );
    SimulatorReport {
        config,
        stats,
        violations,
        final_status: Some(tree.save_status()),
        final_complete: Some(tree.is_complete()),
    }
}

fn generate_assignment(rng: &mut StdRng) -> (AssignmentSnapshot, Layout) {
    let mut layout = Layout {
        text_boxes: Vec::new(),
        slots: Vec::new(),
        accept_list: HashMap::new(),
    };
    let mut snapshot = AssignmentSnapshot::new(AssignmentId::new(), "Simulated assignment");

    for p in 0..rng.random_range(1..=4) {
        let mut part = PartSnapshot::new(PartId::new(), format!("Part {}", p + 1));
        if rng.random_bool(0.25) {
            part = part.optional();
        }
        for _ in 0..rng.random_range(0..=3) {
            let initial = if rng.random_bool(0.3) {
                random_text(rng, 6)
            } else {
                String::new()
            };
            let mut text_box = TextBoxSnapshot::new(TextBoxId::new(), initial);
            if rng.random_bool(0.3) {
                text_box = text_box.optional();
            }
            if rng.random_bool(0.5) {
                text_box = text_box.with_max_length(rng.random_range(8..=24));
            }
            layout.text_boxes.push(text_box.id);
            part = part.with_text_box(text_box);
        }
        for _ in 0..rng.random_range(0..=2) {
            let id = UploadSlotId::new();
            let list = rng.random_range(0..ACCEPT_LISTS.len());
            let file = rng
                .random_bool(0.3)
                .then(|| FileMeta::new("existing.pdf", 1024));
            let mut slot = UploadSlotSnapshot::new(id, file)
                .with_allowed_types(ACCEPT_LISTS[list].iter().copied());
            if rng.random_bool(0.3) {
                slot = slot.optional();
            }
            layout.slots.push(id);
            layout.accept_list.insert(id, list);
            part = part.with_upload_slot(slot);
        }
        snapshot = snapshot.with_part(part);
    }

    (snapshot, layout)
}

fn random_text(rng: &mut StdRng, max_chars: usize) -> String {
    let len = rng.random_range(0..=max_chars);
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())])
        .collect()
}

fn generate_operation(
    rng: &mut StdRng,
    layout: &Layout,
    config: &SimulatorConfig,
) -> SimulatedOperation {
    let has_text = !layout.text_boxes.is_empty();
    let has_slots = !layout.slots.is_empty();

    match rng.random_range(0..100) {
        0..=44 if has_text => SimulatedOperation::Edit {
            text_box: layout.text_boxes[rng.random_range(0..layout.text_boxes.len())],
            text: random_text(rng, 16),
        },
        45..=49 if has_text => SimulatedOperation::Retry {
            text_box: layout.text_boxes[rng.random_range(0..layout.text_boxes.len())],
        },
        50..=64 if has_slots => {
            let (name, _) = CATALOG[rng.random_range(0..CATALOG.len())];
            SimulatedOperation::Upload {
                slot: layout.slots[rng.random_range(0..layout.slots.len())],
                name: name.to_string(),
                size: rng.random_range(0..=config.max_upload_bytes + config.max_upload_bytes / 4),
            }
        }
        65..=74 if has_slots => SimulatedOperation::Delete {
            slot: layout.slots[rng.random_range(0..layout.slots.len())],
        },
        75..=79 if has_slots => SimulatedOperation::Download {
            slot: layout.slots[rng.random_range(0..layout.slots.len())],
        },
        80..=82 => SimulatedOperation::MarkPristine,
        _ => SimulatedOperation::Pause {
            millis: rng.random_range(0..=config.debounce_ms * 2),
        },
    }
}

fn catalog_index(name: &str) -> usize {
    CATALOG
        .iter()
        .position(|(candidate, _)| *candidate == name)
        .unwrap_or(0)
}

/// Independent oracle for what the session should accept
fn expected_acceptance(
    session: &AssignmentSession,
    layout: &Layout,
    operation: &SimulatedOperation,
    config: &SimulatorConfig,
) -> bool {
    let tree = session.tree();
    match operation {
        SimulatedOperation::Edit { text_box, text } => tree
            .text_box(*text_box)
            .is_some_and(|field| field.max_length.map_or(true, |max| text.len() <= max)),
        SimulatedOperation::Upload { slot, name, size } => {
            let Some(upload) = tree.upload_slot(*slot) else {
                return false;
            };
            let list = layout.accept_list.get(slot).copied().unwrap_or(0);
            !upload.state.has_file()
                && *size <= config.max_upload_bytes
                && ACCEPTS[list][catalog_index(name)]
        }
        SimulatedOperation::Delete { slot } => tree
            .upload_slot(*slot)
            .is_some_and(|upload| upload.state.has_file()),
        SimulatedOperation::Retry { .. }
        | SimulatedOperation::Download { .. }
        | SimulatedOperation::MarkPristine
        | SimulatedOperation::Pause { .. } => true,
    }
}

async fn execute(
    session: &AssignmentSession,
    operation: &SimulatedOperation,
) -> Result<(), SessionError> {
    debug!(?operation, "issuing");
    match operation {
        SimulatedOperation::Edit { text_box, text } => session.edit_text(*text_box, text.clone()),
        SimulatedOperation::Retry { text_box } => session.retry_text(*text_box),
        SimulatedOperation::Upload { slot, name, size } => {
            let (_, content_type) = CATALOG[catalog_index(name)];
            let bytes = vec![0; usize::try_from(*size).unwrap_or(0)];
            session.upload_file(
                *slot,
                UploadFile::new(name.clone(), bytes).with_content_type(content_type),
            )
        }
        SimulatedOperation::Delete { slot } => session.delete_file(*slot),
        SimulatedOperation::Download { slot } => session.download_file(*slot),
        SimulatedOperation::MarkPristine => session.mark_pristine(),
        SimulatedOperation::Pause { millis } => {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
            Ok(())
        }
    }
}
