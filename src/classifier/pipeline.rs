//! The per-page classification pipeline.
//!
//! Construction validates the classifier set (unique outputs, known
//! requirements, no dependency cycles) and fixes the execution order with
//! a topological sort; ties break alphabetically by label so the order is
//! deterministic. Per page the driver then runs score, solve, build (with
//! bounded re-solves on build failures), page assembly, and spatial
//! assignment.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::classifier::candidate::CandidateId;
use crate::classifier::classifiers::default_classifiers;
use crate::classifier::report::{ClassificationReport, SolverReport};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::blocks::PageData;
use crate::core::config::{ClassifierConfig, SolverConfig};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::domain::elements::{Page, PageElement};
use crate::domain::hints::DocumentHints;
use crate::solver::assignment::{
    attach_to_nearest, min_cost_assignment, pairing_cost, PairingConfig,
};
use crate::solver::model::{candidate_weight, ConstraintModel};
use crate::solver::schema_gen;

/// The classified page plus its diagnostic report.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub page: Page,
    pub report: ClassificationReport,
}

/// User corrections fed back into candidate selection.
///
/// Candidate ids are stable across runs on the same input (classification
/// is deterministic), so a host can key rejections off a previous run's
/// report.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExternalHints {
    /// Blocks that must not be consumed by any candidate.
    pub excluded_blocks: BTreeSet<crate::core::blocks::BlockId>,
    /// Candidates that must not be selected.
    pub rejected_candidates: BTreeSet<CandidateId>,
}

impl ExternalHints {
    /// Hints with no corrections.
    pub fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.excluded_blocks.is_empty() && self.rejected_candidates.is_empty()
    }
}

/// The dependency-ordered classifier pipeline.
pub struct Pipeline {
    classifiers: BTreeMap<Label, Box<dyn LabelClassifier>>,
    order: Vec<Label>,
    config: ClassifierConfig,
    solver_config: SolverConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("order", &self.order)
            .field("config", &self.config)
            .field("solver_config", &self.solver_config)
            .finish()
    }
}

impl Pipeline {
    /// Creates a pipeline with the default classifier set.
    pub fn new(config: ClassifierConfig, solver_config: SolverConfig) -> ClassifyResult<Self> {
        Self::with_classifiers(default_classifiers(), config, solver_config)
    }

    /// Creates a pipeline from an explicit classifier set.
    ///
    /// Fails when two classifiers output the same label, a requirement
    /// references an unregistered label, or the dependency graph has a
    /// cycle.
    pub fn with_classifiers(
        classifiers: Vec<Box<dyn LabelClassifier>>,
        config: ClassifierConfig,
        solver_config: SolverConfig,
    ) -> ClassifyResult<Self> {
        config.validate()?;
        solver_config.validate()?;

        let mut by_label: BTreeMap<Label, Box<dyn LabelClassifier>> = BTreeMap::new();
        for classifier in classifiers {
            let label = classifier.output();
            if by_label.insert(label, classifier).is_some() {
                return Err(ClassifyError::config_error(format!(
                    "duplicate classifier for label '{}'",
                    label
                )));
            }
        }
        for (label, classifier) in &by_label {
            for required in classifier.requires() {
                if !by_label.contains_key(required) {
                    return Err(ClassifyError::config_error(format!(
                        "classifier '{}' requires unregistered label '{}'",
                        label, required
                    )));
                }
            }
        }
        let order = topological_order(&by_label)?;
        debug!(?order, "pipeline execution order");
        Ok(Self {
            classifiers: by_label,
            order,
            config,
            solver_config,
        })
    }

    /// The deterministic execution order.
    pub fn execution_order(&self) -> &[Label] {
        &self.order
    }

    /// Classifies every page of one document.
    ///
    /// Document hints are computed once from all pages, then each page is
    /// classified independently, in order.
    pub fn classify_document(&self, pages: &[PageData]) -> Vec<PageOutcome> {
        let hints = DocumentHints::from_pages(pages);
        pages
            .iter()
            .map(|page| self.classify_page(page.clone(), &hints))
            .collect()
    }

    /// Parallel variant of [`Pipeline::classify_document`].
    ///
    /// Pages share no mutable state, so they fan out one task per page;
    /// results come back in page order.
    pub fn classify_document_parallel(&self, pages: &[PageData]) -> Vec<PageOutcome> {
        let hints = DocumentHints::from_pages(pages);
        pages
            .par_iter()
            .map(|page| self.classify_page(page.clone(), &hints))
            .collect()
    }

    /// Classifies a single page.
    pub fn classify_page(&self, page: PageData, hints: &DocumentHints) -> PageOutcome {
        self.classify_page_with_hints(page, hints, &ExternalHints::empty())
    }

    /// Classifies a single page, honoring user corrections.
    pub fn classify_page_with_hints(
        &self,
        page: PageData,
        hints: &DocumentHints,
        external: &ExternalHints,
    ) -> PageOutcome {
        let page_bbox = page.bbox();
        let page_index = page.page_index();
        let mut result = ClassificationResult::new(page);
        info!(page = page_index, "classifying page");

        // Phase 1: score, in dependency order.
        let ctx = ScoreCtx {
            hints,
            config: &self.config,
        };
        for label in &self.order {
            let classifier = &self.classifiers[label];
            if let Err(err) = classifier.score(&ctx, &mut result) {
                warn!(label = %label, error = %err, "classifier scoring failed");
                result.add_warning(format!("classifier '{}' failed to score: {}", label, err));
            }
            debug!(
                label = %label,
                candidates = result.candidates_for(*label).len(),
                "scored"
            );
        }

        // Phases 2-3: select and build, re-solving on build failures.
        let mut forbidden: BTreeSet<CandidateId> = external.rejected_candidates.clone();
        if !external.is_empty() {
            for candidate in result.all_candidates() {
                let excluded = candidate
                    .source_blocks
                    .iter()
                    .any(|block| external.excluded_blocks.contains(block));
                if excluded {
                    forbidden.insert(candidate.id());
                }
            }
            let excluded: Vec<CandidateId> = forbidden.iter().copied().collect();
            for id in excluded {
                result.record_failure(id, "excluded by external hints");
            }
        }
        let mut solver_report = SolverReport::default();
        let mut fatal_infeasibility = false;
        let budget = self.solver_config.build_retry_budget;
        let mut attempt = 0;
        loop {
            let outcome = self.select(&mut result, &forbidden);
            solver_report.used_solver = self.solver_config.use_solver;
            solver_report.retries = attempt;
            match &outcome {
                Some(solve) => {
                    solver_report.feasible = solve.feasible;
                    solver_report.optimal = solve.optimal;
                    solver_report.objective = solve.objective;
                    if !solve.feasible {
                        result.add_warning(
                            "constraint solver found no feasible selection; page left unclassified"
                                .to_string(),
                        );
                        fatal_infeasibility = true;
                        break;
                    }
                }
                None => {
                    // Pure greedy selection is always "feasible".
                    solver_report.feasible = true;
                    solver_report.optimal = false;
                }
            }

            match self.build_selected(&mut result) {
                Ok(()) => break,
                Err(failed) => {
                    attempt += 1;
                    if attempt > budget {
                        result.add_warning(format!(
                            "build retry budget exhausted after {} attempts; \
                             emitting partial page",
                            attempt
                        ));
                        break;
                    }
                    warn!(candidate = ?failed, attempt, "build failed; re-solving");
                    forbidden.insert(failed);
                    result.reset_for_resolve();
                    for id in &forbidden {
                        result.record_failure(*id, "build failed; excluded from selection");
                    }
                }
            }
        }
        solver_report.retries = attempt;
        if solver_report.used_solver && solver_report.feasible && !solver_report.optimal {
            result.add_warning(
                "solver timeout; using best selection found within the budget".to_string(),
            );
        }

        // Phases 4-5: assemble the page tree and bind spatial fields.
        let mut page = if fatal_infeasibility {
            Page {
                bbox: page_bbox,
                ..Page::default()
            }
        } else {
            assemble_page(&result, page_bbox)
        };
        page.warnings.extend(result.warnings().iter().cloned());
        if page.page_number.is_none() {
            page.warnings.push(format!("page {}: missing page number", page_index));
        }
        page.unprocessed_blocks = result.unprocessed_blocks();

        let report = ClassificationReport::from_result(&result, solver_report);
        PageOutcome { page, report }
    }

    /// Runs candidate selection: the constraint solver for opted-in
    /// labels, greedy highest-score-first for the rest.
    ///
    /// Returns the solver outcome when the solver ran.
    fn select(
        &self,
        result: &mut ClassificationResult,
        forbidden: &BTreeSet<CandidateId>,
    ) -> Option<crate::solver::model::SolveOutcome> {
        let use_solver = self.solver_config.use_solver;
        let mut selected: BTreeSet<CandidateId> = BTreeSet::new();

        let solver_outcome = if use_solver {
            let mut model = ConstraintModel::new();
            for candidate in result.all_candidates() {
                if !self.solver_config.solver_labels.contains(candidate.label) {
                    continue;
                }
                model.add_candidate(
                    candidate.id(),
                    candidate_weight(
                        candidate.score,
                        candidate.source_blocks.len(),
                        self.solver_config.unconsumed_penalty,
                    ),
                );
            }
            model.add_block_exclusivity_constraints(result);
            schema_gen::generate_all(&mut model, result);
            for label in &self.order {
                self.classifiers[label].declare_constraints(&mut model, result);
            }
            for id in forbidden {
                model.forbid(*id);
            }
            let deadline = Instant::now() + self.solver_config.per_page_timeout;
            let outcome = model.solve(Some(deadline));
            if !outcome.feasible {
                return Some(outcome);
            }
            selected.extend(outcome.selected.iter().copied());
            Some(outcome)
        } else {
            None
        };

        // Greedy pass for labels outside the solver: highest score first,
        // respecting block exclusivity and child availability.
        let mut claimed: BTreeSet<u32> = selected
            .iter()
            .filter_map(|id| result.candidate(*id))
            .flat_map(|c| c.source_blocks.iter().copied())
            .collect();
        for label in &self.order {
            if use_solver && self.solver_config.solver_labels.contains(*label) {
                continue;
            }
            for candidate in result.scored_candidates(*label) {
                let id = candidate.id();
                if forbidden.contains(&id) {
                    continue;
                }
                if candidate
                    .source_blocks
                    .iter()
                    .any(|block| claimed.contains(block))
                {
                    continue;
                }
                if candidate
                    .score_details
                    .child_refs()
                    .iter()
                    .any(|r| !selected.contains(&r.id))
                {
                    continue;
                }
                claimed.extend(candidate.source_blocks.iter().copied());
                selected.insert(id);
            }
        }

        result.set_selected(selected);
        solver_outcome
    }

    /// Builds every selected candidate in dependency order.
    ///
    /// Returns the innermost failing candidate on a build failure.
    fn build_selected(&self, result: &mut ClassificationResult) -> Result<(), CandidateId> {
        for label in &self.order {
            let ids: Vec<CandidateId> = result
                .candidates_for(*label)
                .iter()
                .copied()
                .filter(|id| result.is_selected(*id))
                .collect();
            for id in ids {
                if result.built(id).is_some() {
                    continue;
                }
                let mut ctx = BuildCtx::new(&self.classifiers, result);
                if let Err(err) = ctx.build(id) {
                    let failed = err.failed_candidate().unwrap_or(id);
                    return Err(failed);
                }
            }
        }
        Ok(())
    }
}

/// Kahn's algorithm over the label dependency graph.
///
/// The ready set is ordered, so ties resolve alphabetically.
fn topological_order(
    classifiers: &BTreeMap<Label, Box<dyn LabelClassifier>>,
) -> ClassifyResult<Vec<Label>> {
    let mut in_degree: BTreeMap<Label, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<Label, Vec<Label>> = BTreeMap::new();
    for (label, classifier) in classifiers {
        in_degree.entry(*label).or_insert(0);
        for required in classifier.requires() {
            *in_degree.entry(*label).or_insert(0) += 1;
            dependents.entry(*required).or_default().push(*label);
        }
    }

    let mut ready: BTreeSet<Label> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(label, _)| *label)
        .collect();
    let mut order = Vec::with_capacity(classifiers.len());
    while let Some(label) = ready.iter().next().copied() {
        ready.remove(&label);
        order.push(label);
        for dependent in dependents.get(&label).cloned().unwrap_or_default() {
            let degree = in_degree.get_mut(&dependent).expect("known label");
            *degree -= 1;
            if *degree == 0 {
                ready.insert(dependent);
            }
        }
    }
    if order.len() != classifiers.len() {
        let cyclic: Vec<String> = in_degree
            .iter()
            .filter(|(label, _)| !order.contains(label))
            .map(|(label, _)| label.to_string())
            .collect();
        return Err(ClassifyError::config_error(format!(
            "circular dependency among classifiers: {}",
            cyclic.join(" -> ")
        )));
    }
    Ok(order)
}

/// Assembles the page tree from built elements and binds spatial fields.
fn assemble_page(result: &ClassificationResult, page_bbox: crate::core::geometry::BBox) -> Page {
    // Children embedded in built composites must not surface again at the
    // page level.
    let mut embedded: BTreeSet<CandidateId> = BTreeSet::new();
    for (id, _) in result.built_elements() {
        if let Some(candidate) = result.candidate(*id) {
            for child in candidate.score_details.child_refs() {
                if result.built(child.id).is_some() {
                    embedded.insert(child.id);
                }
            }
        }
    }

    let mut page = Page {
        bbox: page_bbox,
        ..Page::default()
    };
    let mut steps = Vec::new();
    let mut diagrams = Vec::new();
    let mut rotation_symbols = Vec::new();
    let mut arrows = Vec::new();
    let mut sub_assemblies = Vec::new();
    let mut sub_steps = Vec::new();
    let mut indicators = Vec::new();

    for (id, element) in result.built_elements() {
        if embedded.contains(id) {
            continue;
        }
        match element.clone() {
            PageElement::PageNumber(e) => {
                if page.page_number.is_none() {
                    page.page_number = Some(e);
                } else {
                    page.unplaced.push(e.into());
                }
            }
            PageElement::Step(e) => steps.push(e),
            PageElement::PartsList(e) => page.parts_lists.push(e),
            PageElement::Diagram(e) => diagrams.push(e),
            PageElement::Arrow(e) => arrows.push(e),
            PageElement::RotationSymbol(e) => rotation_symbols.push(e),
            PageElement::SubAssembly(e) => sub_assemblies.push(e),
            PageElement::SubStep(e) => sub_steps.push(e),
            PageElement::OpenBag(e) => page.open_bags.push(e),
            PageElement::ProgressBar(e) => {
                if page.progress_bar.is_none() {
                    page.progress_bar = Some(e);
                } else {
                    page.unplaced.push(e.into());
                }
            }
            PageElement::ProgressBarIndicator(e) => indicators.push(e),
            PageElement::Background(e) => {
                if page.background.is_none() {
                    page.background = Some(e);
                } else {
                    page.unplaced.push(e.into());
                }
            }
            PageElement::Divider(e) => page.dividers.push(e),
            PageElement::LoosePartSymbol(e) => page.loose_part_symbols.push(e),
            PageElement::Shine(e) => page.shines.push(e),
            // Leaves selected without a composite parent.
            other => page.unplaced.push(other),
        }
    }

    let pairing = PairingConfig::default();
    let divider_boxes: Vec<_> = page.dividers.iter().map(|d| d.bbox).collect();

    // Sub-steps into sub-assemblies (many per parent).
    if !sub_assemblies.is_empty() {
        let parent_boxes: Vec<_> = sub_assemblies.iter().map(|s| s.bbox).collect();
        let child_boxes: Vec<_> = sub_steps.iter().map(|s| s.bbox).collect();
        let attachments = attach_to_nearest(&parent_boxes, &child_boxes, &pairing, &[]);
        for (sub_step, parent) in sub_steps.into_iter().zip(attachments) {
            let index = parent.unwrap_or_else(|| {
                nearest_by_distance(&parent_boxes, &sub_step.bbox).unwrap_or(0)
            });
            sub_assemblies[index].sub_steps.push(sub_step);
        }
        for sub_assembly in &mut sub_assemblies {
            sub_assembly.sub_steps.sort_by_key(|s| s.number.value);
        }
    } else {
        page.unplaced.extend(sub_steps.into_iter().map(Into::into));
    }

    // Diagrams into steps, one-to-one by minimum cost. The step number is
    // the spatial anchor: it sits at the top-left of its diagram.
    if !steps.is_empty() && !diagrams.is_empty() {
        let cost: Vec<Vec<Option<f64>>> = steps
            .iter()
            .map(|step| {
                diagrams
                    .iter()
                    .map(|diagram| {
                        pairing_cost(
                            &step.step_number.bbox,
                            &diagram.bbox,
                            &pairing,
                            &divider_boxes,
                        )
                    })
                    .collect()
            })
            .collect();
        let assignment = min_cost_assignment(&cost);
        let mut taken: BTreeSet<usize> = BTreeSet::new();
        for (step_index, diagram_index) in assignment.iter().enumerate() {
            if let Some(diagram_index) = diagram_index {
                let diagram = diagrams[*diagram_index].clone();
                steps[step_index].bbox =
                    steps[step_index].bbox.union(&diagram.bbox).clip_to(&page_bbox);
                steps[step_index].diagram = Some(diagram);
                taken.insert(*diagram_index);
            }
        }
        for (index, diagram) in diagrams.into_iter().enumerate() {
            if !taken.contains(&index) {
                page.standalone_diagrams.push(diagram);
            }
        }
    } else {
        page.standalone_diagrams.extend(diagrams);
    }

    // Rotation symbols into steps, at most one per step.
    if !steps.is_empty() && !rotation_symbols.is_empty() {
        let cost: Vec<Vec<Option<f64>>> = rotation_symbols
            .iter()
            .map(|symbol| {
                steps
                    .iter()
                    .map(|step| {
                        let anchor = step
                            .diagram
                            .as_ref()
                            .map(|d| d.bbox)
                            .unwrap_or(step.bbox);
                        pairing_cost(&symbol.bbox, &anchor, &pairing, &divider_boxes)
                            .or_else(|| Some(symbol.bbox.min_distance(&anchor)))
                    })
                    .collect()
            })
            .collect();
        let assignment = min_cost_assignment(&cost);
        for (symbol, step_index) in rotation_symbols.into_iter().zip(assignment) {
            match step_index {
                Some(index) if steps[index].rotation_symbol.is_none() => {
                    steps[index].rotation_symbol = Some(symbol);
                }
                _ => page.unplaced.push(symbol.into()),
            }
        }
    } else {
        page.unplaced
            .extend(rotation_symbols.into_iter().map(Into::into));
    }

    // Arrows into steps (many per step).
    if !steps.is_empty() {
        let step_boxes: Vec<_> = steps.iter().map(|s| s.bbox).collect();
        let arrow_boxes: Vec<_> = arrows.iter().map(|a| a.bbox).collect();
        let attachments = attach_to_nearest(&step_boxes, &arrow_boxes, &pairing, &divider_boxes);
        for (arrow, step_index) in arrows.into_iter().zip(attachments) {
            match step_index.or_else(|| nearest_by_distance(&step_boxes, &arrow.bbox)) {
                Some(index) => steps[index].arrows.push(arrow),
                None => page.standalone_arrows.push(arrow),
            }
        }
    } else {
        page.standalone_arrows.extend(arrows);
    }

    // Sub-assemblies into steps (many per step).
    if !steps.is_empty() {
        let step_boxes: Vec<_> = steps.iter().map(|s| s.bbox).collect();
        let sub_boxes: Vec<_> = sub_assemblies.iter().map(|s| s.bbox).collect();
        let attachments = attach_to_nearest(&step_boxes, &sub_boxes, &pairing, &divider_boxes);
        for (sub_assembly, step_index) in sub_assemblies.into_iter().zip(attachments) {
            match step_index.or_else(|| nearest_by_distance(&step_boxes, &sub_assembly.bbox)) {
                Some(index) => steps[index].sub_assemblies.push(sub_assembly),
                None => page.unplaced.push(sub_assembly.into()),
            }
        }
    } else {
        page.unplaced
            .extend(sub_assemblies.into_iter().map(Into::into));
    }

    // The progress bar's indicator slot.
    for indicator in indicators {
        match &mut page.progress_bar {
            Some(bar) if bar.indicator.is_none() => bar.indicator = Some(indicator),
            _ => page.unplaced.push(indicator.into()),
        }
    }

    steps.sort_by_key(|s| s.step_number.value);
    page.steps = steps;
    page
}

/// Index of the box nearest to `target`, by minimum edge distance.
fn nearest_by_distance(
    boxes: &[crate::core::geometry::BBox],
    target: &crate::core::geometry::BBox,
) -> Option<usize> {
    boxes
        .iter()
        .enumerate()
        .min_by(|a, b| {
            a.1.min_distance(target)
                .total_cmp(&b.1.min_distance(target))
        })
        .map(|(index, _)| index)
}
