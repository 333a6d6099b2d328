//! Variance engine
//!
//! Pairs requirement values with offered or as-built values field by field.
//! Computing a variance is pure; only a reviewer's accept/reject decision is
//! stored. A decision carries the normalized values it was made against and
//! is ignored once either side changes, which drops the field back to its
//! computed `Matches`/`Deviates` outcome.

use crate::types::{
    FieldDataType, FieldLayout, FieldValue, InfoTemplateId, PartyId, RawValue, SheetId,
    SheetLayout, SubsheetId, ValueSet, ValueSetContext, ValueSetId, VarianceDecision,
    VarianceStatus,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Subsheet collecting paired fields the template layout does not place
pub const UNASSIGNED_SUBSHEET_ID: SubsheetId = SubsheetId(0);

/// Name of the subsheet for unplaced fields
pub const UNASSIGNED_SUBSHEET_NAME: &str = "Unassigned";

/// Comparable form of a field value
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Parsed numeric value
    Number(f64),
    /// Trimmed text
    Text(String),
}

impl Normalized {
    /// Stable textual form, used as the decision snapshot
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Normalized::Number(n) => n.to_string(),
            Normalized::Text(s) => s.clone(),
        }
    }
}

fn raw_text(raw: &RawValue) -> Option<String> {
    match raw {
        RawValue::Null => None,
        RawValue::Number(n) => Some(n.to_string()),
        RawValue::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}

/// Normalize a raw value; `None` means absent
#[must_use]
pub fn normalize(raw: &RawValue, data_type: FieldDataType) -> Option<Normalized> {
    let text = raw_text(raw)?;
    if data_type == FieldDataType::Number {
        if let Ok(n) = text.parse::<f64>() {
            if n.is_finite() {
                return Some(Normalized::Number(n));
            }
        }
    }
    Some(Normalized::Text(text))
}

/// Computed outcome for two present values
#[must_use]
pub fn compare_normalized(requirement: &Normalized, counterpart: &Normalized) -> VarianceStatus {
    let equal = match (requirement, counterpart) {
        (Normalized::Number(a), Normalized::Number(b)) => a == b,
        (a, b) => a.canonical() == b.canonical(),
    };
    if equal {
        VarianceStatus::Matches
    } else {
        VarianceStatus::Deviates
    }
}

/// Variance of one field pairing
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Outcome from the values alone
    pub computed: VarianceStatus,
    /// Outcome after applying a still-valid decision
    pub effective: VarianceStatus,
    /// Normalized requirement value
    pub requirement: Normalized,
    /// Normalized counterpart value
    pub counterpart: Normalized,
}

impl Evaluation {
    /// Build the decision record that would pin this evaluation
    #[must_use]
    pub fn decision(
        &self,
        sheet: SheetId,
        value_set: ValueSetId,
        field: InfoTemplateId,
        status: VarianceStatus,
    ) -> VarianceDecision {
        VarianceDecision {
            sheet_id: sheet,
            value_set_id: value_set,
            info_template_id: field,
            status,
            requirement_value: self.requirement.canonical(),
            counterpart_value: self.counterpart.canonical(),
        }
    }
}

/// Value sets chosen to take part in a comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Newest requirement set
    pub requirement: Option<ValueSet>,
    /// Newest offered set, filtered by party when asked
    pub offered: Option<ValueSet>,
    /// Newest as-built set
    pub as_built: Option<ValueSet>,
}

/// Values and decisions of one counterpart column
#[derive(Debug, Clone)]
pub struct Column {
    /// Offered or AsBuilt set
    pub value_set: ValueSet,
    /// Field values keyed by template field
    pub values: HashMap<InfoTemplateId, RawValue>,
    /// Decisions keyed by template field
    pub decisions: HashMap<InfoTemplateId, VarianceDecision>,
}

impl Column {
    /// Build from store rows
    #[must_use]
    pub fn new(
        value_set: ValueSet,
        values: Vec<FieldValue>,
        decisions: Vec<VarianceDecision>,
    ) -> Self {
        Self {
            value_set,
            values: index_values(values),
            decisions: decisions
                .into_iter()
                .map(|d| (d.info_template_id, d))
                .collect(),
        }
    }
}

fn newest(sets: &[ValueSet], pred: impl Fn(&ValueSet) -> bool) -> Option<ValueSet> {
    sets.iter()
        .filter(|vs| pred(vs))
        .max_by_key(|vs| vs.value_set_id)
        .cloned()
}

/// Key field values by template field
#[must_use]
pub fn index_values(values: Vec<FieldValue>) -> HashMap<InfoTemplateId, RawValue> {
    values
        .into_iter()
        .map(|fv| (fv.info_template_id, fv.value))
        .collect()
}

/// Grouped comparison output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareView {
    /// Requirement set used, if any
    pub requirement_value_set_id: Option<ValueSetId>,
    /// Offered set used, if any
    pub offered_value_set_id: Option<ValueSetId>,
    /// As-built set used, if any
    pub as_built_value_set_id: Option<ValueSetId>,
    /// Subsheets in layout order
    pub subsheets: Vec<CompareSubsheet>,
    /// Outcome counts over every cell in the view
    pub summary: VarianceSummary,
}

impl CompareView {
    /// Find a field anywhere in the view
    #[must_use]
    pub fn field(&self, id: InfoTemplateId) -> Option<&CompareField> {
        self.subsheets
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.info_template_id == id)
    }
}

/// One subsheet of the comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareSubsheet {
    /// Subsheet identifier
    pub id: SubsheetId,
    /// Subsheet name
    pub name: String,
    /// Compared fields in layout order
    pub fields: Vec<CompareField>,
}

/// One compared field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareField {
    /// Template field
    pub info_template_id: InfoTemplateId,
    /// Display label
    pub label: String,
    /// Unit of measure
    pub uom: Option<String>,
    /// Requirement value as stored
    pub requirement_value: RawValue,
    /// Offered column
    pub offered: Option<CompareCell>,
    /// As-built column
    pub as_built: Option<CompareCell>,
}

/// Counterpart value with its variance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareCell {
    /// Value set the value came from
    pub value_set_id: ValueSetId,
    /// Value as stored
    pub value: RawValue,
    /// Effective variance
    pub variance: VarianceStatus,
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceSummary {
    /// Matching cells
    pub matches: usize,
    /// Undecided deviations
    pub deviates: usize,
    /// Accepted deviations
    pub deviates_accepted: usize,
    /// Rejected deviations
    pub deviates_rejected: usize,
}

impl VarianceSummary {
    fn record(&mut self, status: VarianceStatus) {
        match status {
            VarianceStatus::Matches => self.matches += 1,
            VarianceStatus::Deviates => self.deviates += 1,
            VarianceStatus::DeviatesAccepted => self.deviates_accepted += 1,
            VarianceStatus::DeviatesRejected => self.deviates_rejected += 1,
        }
    }

    /// Cells still awaiting a reviewer
    #[inline]
    #[must_use]
    pub fn open(&self) -> usize {
        self.deviates
    }
}

/// Comparison and decision logic
#[derive(Debug, Clone, Copy, Default)]
pub struct VarianceEngine;

impl VarianceEngine {
    /// Create engine
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Pick the requirement, offered and as-built sets to compare
    ///
    /// The newest set of each context wins; `party` restricts the offered
    /// column to that party's offers.
    #[must_use]
    pub fn select(&self, sets: &[ValueSet], party: Option<PartyId>) -> Selection {
        Selection {
            requirement: newest(sets, |vs| vs.context == ValueSetContext::Requirement),
            offered: newest(sets, |vs| {
                vs.context == ValueSetContext::Offered
                    && party.map_or(true, |p| vs.party_id == Some(p))
            }),
            as_built: newest(sets, |vs| vs.context == ValueSetContext::AsBuilt),
        }
    }

    /// Evaluate one pairing; `None` if either value is absent
    #[must_use]
    pub fn evaluate(
        &self,
        data_type: FieldDataType,
        requirement: &RawValue,
        counterpart: &RawValue,
        decision: Option<&VarianceDecision>,
    ) -> Option<Evaluation> {
        let requirement = normalize(requirement, data_type)?;
        let counterpart = normalize(counterpart, data_type)?;
        let computed = compare_normalized(&requirement, &counterpart);

        let effective = match decision {
            Some(d)
                if computed == VarianceStatus::Deviates
                    && d.status.is_decision()
                    && d.requirement_value == requirement.canonical()
                    && d.counterpart_value == counterpart.canonical() =>
            {
                d.status
            }
            _ => computed,
        };

        Some(Evaluation {
            computed,
            effective,
            requirement,
            counterpart,
        })
    }

    fn cell(
        &self,
        data_type: FieldDataType,
        field: InfoTemplateId,
        requirement: &RawValue,
        column: Option<&Column>,
    ) -> Option<CompareCell> {
        let column = column?;
        let value = column.values.get(&field)?;
        let evaluation =
            self.evaluate(data_type, requirement, value, column.decisions.get(&field))?;
        Some(CompareCell {
            value_set_id: column.value_set.value_set_id,
            value: value.clone(),
            variance: evaluation.effective,
        })
    }

    fn compare_field(
        &self,
        field: &FieldLayout,
        requirement: &RawValue,
        offered: Option<&Column>,
        as_built: Option<&Column>,
        summary: &mut VarianceSummary,
    ) -> Option<CompareField> {
        let id = field.info_template_id;
        let offered_cell = self.cell(field.data_type, id, requirement, offered);
        let as_built_cell = self.cell(field.data_type, id, requirement, as_built);
        if offered_cell.is_none() && as_built_cell.is_none() {
            return None;
        }

        for cell in [&offered_cell, &as_built_cell].into_iter().flatten() {
            summary.record(cell.variance);
        }
        Some(CompareField {
            info_template_id: id,
            label: field.label.clone(),
            uom: field.uom.clone(),
            requirement_value: requirement.clone(),
            offered: offered_cell,
            as_built: as_built_cell,
        })
    }

    /// Build the grouped comparison view
    ///
    /// A field appears only if it has a requirement value and at least one
    /// counterpart value. Layout subsheets are always listed; paired fields
    /// the layout does not place go to a trailing "Unassigned" subsheet,
    /// ordered by field id, which is present only when it has fields.
    #[must_use]
    pub fn build_view(
        &self,
        layout: &SheetLayout,
        requirement: Option<(&ValueSet, &HashMap<InfoTemplateId, RawValue>)>,
        offered: Option<&Column>,
        as_built: Option<&Column>,
    ) -> CompareView {
        let mut summary = VarianceSummary::default();
        let mut subsheets = Vec::with_capacity(layout.subsheets.len() + 1);
        let mut placed = HashSet::new();

        for subsheet in &layout.subsheets {
            let mut fields = Vec::new();
            for field in &subsheet.fields {
                placed.insert(field.info_template_id);
                let req = requirement.and_then(|(_, values)| values.get(&field.info_template_id));
                let Some(req) = req else {
                    continue;
                };
                fields.extend(self.compare_field(field, req, offered, as_built, &mut summary));
            }
            subsheets.push(CompareSubsheet {
                id: subsheet.id,
                name: subsheet.name.clone(),
                fields,
            });
        }

        if let Some((_, req_values)) = requirement {
            let mut unplaced: Vec<_> = req_values
                .iter()
                .filter(|(id, _)| !placed.contains(*id))
                .collect();
            unplaced.sort_by_key(|(id, _)| **id);

            let fields: Vec<CompareField> = unplaced
                .into_iter()
                .filter_map(|(id, req)| {
                    let field = FieldLayout::new(id.get(), id.to_string(), FieldDataType::default());
                    self.compare_field(&field, req, offered, as_built, &mut summary)
                })
                .collect();
            if !fields.is_empty() {
                subsheets.push(CompareSubsheet {
                    id: UNASSIGNED_SUBSHEET_ID,
                    name: UNASSIGNED_SUBSHEET_NAME.to_string(),
                    fields,
                });
            }
        }

        CompareView {
            requirement_value_set_id: requirement.map(|(vs, _)| vs.value_set_id),
            offered_value_set_id: offered.map(|c| c.value_set.value_set_id),
            as_built_value_set_id: as_built.map(|c| c.value_set.value_set_id),
            subsheets,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SubsheetLayout, ValueSetStatus};

    fn vs(id: u64, context: ValueSetContext, party: Option<u64>) -> ValueSet {
        ValueSet {
            value_set_id: ValueSetId(id),
            sheet_id: SheetId(1),
            context,
            party_id: party.map(PartyId),
            status: ValueSetStatus::Draft,
        }
    }

    fn values(pairs: &[(u64, RawValue)]) -> HashMap<InfoTemplateId, RawValue> {
        pairs
            .iter()
            .map(|(id, v)| (InfoTemplateId(*id), v.clone()))
            .collect()
    }

    #[test]
    fn numbers_compare_numerically() {
        let a = normalize(&RawValue::text(" 120 "), FieldDataType::Number).unwrap();
        let b = normalize(&RawValue::text("120.0"), FieldDataType::Number).unwrap();
        let c = normalize(&RawValue::number(125.0), FieldDataType::Number).unwrap();

        assert_eq!(compare_normalized(&a, &b), VarianceStatus::Matches);
        assert_eq!(compare_normalized(&a, &c), VarianceStatus::Deviates);
    }

    #[test]
    fn text_compares_trimmed_exact() {
        let a = normalize(&RawValue::text("  SS316 "), FieldDataType::Text).unwrap();
        let b = normalize(&RawValue::text("SS316"), FieldDataType::Text).unwrap();
        let c = normalize(&RawValue::text("ss316"), FieldDataType::Option).unwrap();
        let d = normalize(&RawValue::text("120.0"), FieldDataType::Text).unwrap();
        let e = normalize(&RawValue::text("120"), FieldDataType::Text).unwrap();

        assert_eq!(compare_normalized(&a, &b), VarianceStatus::Matches);
        assert_eq!(compare_normalized(&a, &c), VarianceStatus::Deviates);
        assert_eq!(compare_normalized(&d, &e), VarianceStatus::Deviates);
    }

    #[test]
    fn unparseable_number_falls_back_to_text() {
        let a = normalize(&RawValue::text("N/A"), FieldDataType::Number).unwrap();
        let b = normalize(&RawValue::text("N/A"), FieldDataType::Number).unwrap();
        assert_eq!(a, Normalized::Text("N/A".into()));
        assert_eq!(compare_normalized(&a, &b), VarianceStatus::Matches);
    }

    #[test]
    fn null_and_blank_are_absent() {
        assert!(normalize(&RawValue::Null, FieldDataType::Text).is_none());
        assert!(normalize(&RawValue::text("   "), FieldDataType::Number).is_none());
        assert!(VarianceEngine::new()
            .evaluate(FieldDataType::Text, &RawValue::Null, &RawValue::text("x"), None)
            .is_none());
    }

    #[test]
    fn decision_applies_until_a_value_changes() {
        let engine = VarianceEngine::new();
        let req = RawValue::text("120");
        let offer = RawValue::text("125");

        let eval = engine
            .evaluate(FieldDataType::Number, &req, &offer, None)
            .unwrap();
        assert_eq!(eval.effective, VarianceStatus::Deviates);

        let decision = eval.decision(
            SheetId(1),
            ValueSetId(2),
            InfoTemplateId(101),
            VarianceStatus::DeviatesAccepted,
        );
        let pinned = engine
            .evaluate(FieldDataType::Number, &req, &offer, Some(&decision))
            .unwrap();
        assert_eq!(pinned.effective, VarianceStatus::DeviatesAccepted);

        let edited = engine
            .evaluate(FieldDataType::Number, &req, &RawValue::text("130"), Some(&decision))
            .unwrap();
        assert_eq!(edited.effective, VarianceStatus::Deviates);

        let now_matching = engine
            .evaluate(FieldDataType::Number, &req, &RawValue::text("120"), Some(&decision))
            .unwrap();
        assert_eq!(now_matching.effective, VarianceStatus::Matches);
    }

    #[test]
    fn select_prefers_newest_and_filters_party() {
        let sets = vec![
            vs(1, ValueSetContext::Requirement, None),
            vs(2, ValueSetContext::Offered, Some(5)),
            vs(3, ValueSetContext::Offered, Some(6)),
            vs(4, ValueSetContext::Requirement, None),
        ];
        let engine = VarianceEngine::new();

        let all = engine.select(&sets, None);
        assert_eq!(all.requirement.unwrap().value_set_id, ValueSetId(4));
        assert_eq!(all.offered.unwrap().value_set_id, ValueSetId(3));
        assert!(all.as_built.is_none());

        let party5 = engine.select(&sets, Some(PartyId(5)));
        assert_eq!(party5.offered.unwrap().value_set_id, ValueSetId(2));

        let nobody = engine.select(&sets, Some(PartyId(7)));
        assert!(nobody.offered.is_none());
    }

    #[test]
    fn view_excludes_unpaired_fields() {
        let layout = SheetLayout::new()
            .with_subsheet(
                SubsheetLayout::new(1, "Process")
                    .with_field(FieldLayout::new(101, "Flow", FieldDataType::Number))
                    .with_field(FieldLayout::new(102, "Fluid", FieldDataType::Text))
                    .with_field(FieldLayout::new(103, "Phase", FieldDataType::Option)),
            )
            .with_subsheet(SubsheetLayout::new(2, "Mechanical"));

        let req_set = vs(1, ValueSetContext::Requirement, None);
        let req_values = values(&[
            (101, RawValue::text("120")),
            (102, RawValue::text("Water")),
        ]);
        let offered = Column::new(
            vs(2, ValueSetContext::Offered, Some(5)),
            vec![
                FieldValue {
                    value_set_id: ValueSetId(2),
                    info_template_id: InfoTemplateId(101),
                    value: RawValue::text("125"),
                },
                FieldValue {
                    value_set_id: ValueSetId(2),
                    info_template_id: InfoTemplateId(103),
                    value: RawValue::text("Liquid"),
                },
            ],
            vec![],
        );

        let view = VarianceEngine::new().build_view(
            &layout,
            Some((&req_set, &req_values)),
            Some(&offered),
            None,
        );

        assert_eq!(view.subsheets.len(), 2);
        assert_eq!(view.subsheets[0].fields.len(), 1);
        assert!(view.subsheets[1].fields.is_empty());

        let flow = view.field(InfoTemplateId(101)).unwrap();
        assert_eq!(flow.offered.as_ref().unwrap().variance, VarianceStatus::Deviates);
        assert!(flow.as_built.is_none());
        assert_eq!(view.summary.deviates, 1);
        assert_eq!(view.summary.open(), 1);
        assert_eq!(view.offered_value_set_id, Some(ValueSetId(2)));
    }

    #[test]
    fn unplaced_fields_go_to_unassigned_subsheet() {
        let req_set = vs(1, ValueSetContext::Requirement, None);
        let req_values = values(&[
            (205, RawValue::text("Carbon steel")),
            (101, RawValue::text("120")),
            (300, RawValue::text("only on requirement")),
        ]);
        let offered = Column::new(
            vs(2, ValueSetContext::Offered, None),
            vec![
                FieldValue {
                    value_set_id: ValueSetId(2),
                    info_template_id: InfoTemplateId(101),
                    value: RawValue::text("125"),
                },
                FieldValue {
                    value_set_id: ValueSetId(2),
                    info_template_id: InfoTemplateId(205),
                    value: RawValue::text("Carbon steel"),
                },
            ],
            vec![],
        );

        let view = VarianceEngine::new().build_view(
            &SheetLayout::default(),
            Some((&req_set, &req_values)),
            Some(&offered),
            None,
        );

        assert_eq!(view.subsheets.len(), 1);
        let unassigned = &view.subsheets[0];
        assert_eq!(unassigned.id, UNASSIGNED_SUBSHEET_ID);
        assert_eq!(unassigned.name, UNASSIGNED_SUBSHEET_NAME);
        let ids: Vec<_> = unassigned.fields.iter().map(|f| f.info_template_id).collect();
        assert_eq!(ids, vec![InfoTemplateId(101), InfoTemplateId(205)]);
        assert_eq!(view.summary.deviates, 1);
        assert_eq!(view.summary.matches, 1);
    }

    #[test]
    fn placed_fields_never_repeat_as_unassigned() {
        let layout = SheetLayout::new().with_subsheet(
            SubsheetLayout::new(1, "Process")
                .with_field(FieldLayout::new(101, "Flow", FieldDataType::Number)),
        );
        let req_set = vs(1, ValueSetContext::Requirement, None);
        let req_values = values(&[(101, RawValue::text("120"))]);
        let offered = Column::new(
            vs(2, ValueSetContext::Offered, None),
            vec![FieldValue {
                value_set_id: ValueSetId(2),
                info_template_id: InfoTemplateId(101),
                value: RawValue::text("120.0"),
            }],
            vec![],
        );

        let view = VarianceEngine::new().build_view(
            &layout,
            Some((&req_set, &req_values)),
            Some(&offered),
            None,
        );
        assert_eq!(view.subsheets.len(), 1);
        assert_eq!(view.subsheets[0].fields.len(), 1);
        assert_eq!(view.summary.matches, 1);
    }

    #[test]
    fn view_without_requirement_lists_empty_subsheets() {
        let layout = SheetLayout::new().with_subsheet(
            SubsheetLayout::new(1, "Process")
                .with_field(FieldLayout::new(101, "Flow", FieldDataType::Number)),
        );
        let view = VarianceEngine::new().build_view(&layout, None, None, None);
        assert_eq!(view.subsheets.len(), 1);
        assert!(view.subsheets[0].fields.is_empty());
        assert_eq!(view.summary, VarianceSummary::default());
    }
}
