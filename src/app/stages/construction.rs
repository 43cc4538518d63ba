use crate::domain::model::{
    ConstructionSpec, ConstructionStep, ConstructionZone, FabricSpec, FinishingStep, ProjectType,
    RelativePosition, RequirementsSpec, BORDER_ZONE, MAIN_BODY_ZONE,
};
use crate::domain::ports::Stage;
use crate::utils::error::{PipelineStage, StageError, StageResult};

const LARGE_PROJECT_AREA: f64 = 3000.0;

pub struct ConstructionInput<'a> {
    pub requirements: &'a RequirementsSpec,
    pub fabric_spec: &'a FabricSpec,
}

/// Splits the piece into zones and orders the work.
#[derive(Debug, Default)]
pub struct ConstructionStage;

impl ConstructionStage {
    pub fn new() -> Self {
        Self
    }

    fn plan_construction_zones(
        &self,
        requirements: &RequirementsSpec,
        fabric_spec: &FabricSpec,
    ) -> StageResult<Vec<ConstructionZone>> {
        let mut zones = Vec::new();

        match requirements.project_type {
            ProjectType::Blanket => {
                if let Some(border) = &fabric_spec.border_pattern {
                    if border.name.is_empty() {
                        return Err(StageError::construction(
                            "border_planning",
                            "Invalid border pattern: missing name",
                        ));
                    }
                    zones.push(ConstructionZone {
                        name: BORDER_ZONE.to_string(),
                        stitch_pattern: border.clone(),
                        relative_position: RelativePosition::Perimeter,
                        priority: 1,
                    });
                }

                if fabric_spec.stitch_pattern.name.is_empty() {
                    return Err(StageError::construction(
                        "main_pattern_planning",
                        "Invalid main stitch pattern: missing name",
                    ));
                }
                zones.push(ConstructionZone {
                    name: MAIN_BODY_ZONE.to_string(),
                    stitch_pattern: fabric_spec.stitch_pattern.clone(),
                    relative_position: RelativePosition::Center,
                    priority: 2,
                });
            }
        }

        Ok(zones)
    }

    fn plan_construction_sequence(
        &self,
        requirements: &RequirementsSpec,
        zones: &[ConstructionZone],
    ) -> Vec<ConstructionStep> {
        let mut sequence = vec![ConstructionStep::CastOn];

        match requirements.project_type {
            ProjectType::Blanket => {
                if zones.iter().any(|z| z.name == BORDER_ZONE) {
                    sequence.extend([
                        ConstructionStep::BottomBorder,
                        ConstructionStep::MainBodyWithSideBorders,
                        ConstructionStep::TopBorder,
                    ]);
                } else {
                    sequence.push(ConstructionStep::MainBody);
                }
                sequence.extend([ConstructionStep::BindOff, ConstructionStep::Finishing]);
            }
        }

        sequence
    }

    fn plan_finishing_requirements(
        &self,
        requirements: &RequirementsSpec,
        fabric_spec: &FabricSpec,
    ) -> Vec<FinishingStep> {
        let mut finishing = vec![FinishingStep::WeaveInEnds];

        if requirements.project_type == ProjectType::Blanket {
            finishing.push(FinishingStep::Blocking);
        }

        let pattern_name = &fabric_spec.stitch_pattern.name;
        if pattern_name.contains("Cable") {
            finishing.push(FinishingStep::CableBlocking);
        } else if pattern_name.contains("Lace") {
            finishing.push(FinishingStep::AggressiveBlocking);
        }

        finishing
    }

    fn generate_structural_notes(
        &self,
        requirements: &RequirementsSpec,
        fabric_spec: &FabricSpec,
        zones: &[ConstructionZone],
    ) -> Vec<String> {
        let mut notes = Vec::new();

        if requirements.dimensions.area() > LARGE_PROJECT_AREA {
            notes.push("Large project - consider using circular needles for comfort".to_string());
            notes.push("Work may become heavy - take breaks to avoid strain".to_string());
        }

        if fabric_spec.stitch_pattern.name.contains("Cable") {
            notes.push("Cable pattern requires consistent tension for even appearance".to_string());
            notes.push("Consider using cable needle or preferred cable method".to_string());
        }

        if zones.iter().any(|z| z.name == BORDER_ZONE) {
            notes.push(
                "Border integrated into main construction - no separate pickup required"
                    .to_string(),
            );
            notes.push("Maintain consistent edge tension for professional finish".to_string());
        }

        notes.push("Pattern worked flat in rows (not circular)".to_string());
        notes.push(
            "Right side rows are odd-numbered, wrong side rows are even-numbered".to_string(),
        );

        notes
    }

    fn validate_construction_plan(
        &self,
        zones: &[ConstructionZone],
        sequence: &[ConstructionStep],
        finishing: &[FinishingStep],
    ) -> StageResult<()> {
        if zones.is_empty() {
            return Err(StageError::construction("plan_validation", "No construction zones planned"));
        }
        if sequence.is_empty() {
            return Err(StageError::construction("plan_validation", "No construction sequence planned"));
        }
        if finishing.is_empty() {
            return Err(StageError::construction("plan_validation", "No finishing requirements planned"));
        }
        if zones.iter().any(|z| z.name.is_empty()) {
            return Err(StageError::construction("zone_validation", "Construction zone missing name"));
        }
        Ok(())
    }
}

impl<'a> Stage<'a> for ConstructionStage {
    type Input = ConstructionInput<'a>;
    type Output = ConstructionSpec;

    fn kind(&self) -> PipelineStage {
        PipelineStage::Construction
    }

    fn agent(&self) -> &'static str {
        "construction_planner"
    }

    fn process(&self, input: ConstructionInput<'a>) -> StageResult<ConstructionSpec> {
        let ConstructionInput {
            requirements,
            fabric_spec,
        } = input;

        let zones = self.plan_construction_zones(requirements, fabric_spec)?;
        let sequence = self.plan_construction_sequence(requirements, &zones);
        let finishing = self.plan_finishing_requirements(requirements, fabric_spec);
        let structural_notes = self.generate_structural_notes(requirements, fabric_spec, &zones);

        self.validate_construction_plan(&zones, &sequence, &finishing)?;

        tracing::debug!(
            "Planned {} zones and {} construction steps",
            zones.len(),
            sequence.len()
        );

        Ok(ConstructionSpec {
            target_dimensions: requirements.dimensions,
            construction_zones: zones,
            construction_sequence: sequence,
            finishing_requirements: finishing,
            structural_notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::stages::fabric::{seed_stitch_border, simple_cable, stockinette};
    use crate::domain::model::{Dimensions, Gauge, YarnSpec};
    use std::collections::BTreeMap;

    fn requirements(width: f64, length: f64) -> RequirementsSpec {
        RequirementsSpec {
            project_type: ProjectType::Blanket,
            dimensions: Dimensions::new(width, length),
            style_preferences: BTreeMap::new(),
            special_requirements: vec![],
        }
    }

    fn fabric(main: crate::domain::model::StitchPattern, with_border: bool) -> FabricSpec {
        FabricSpec {
            stitch_pattern: main,
            border_pattern: with_border.then(seed_stitch_border),
            yarn_requirements: YarnSpec {
                weight: "worsted".to_string(),
                fiber: "wool".to_string(),
                color: None,
            },
            gauge: Gauge::new(4.0, 5.5),
            construction_notes: vec![],
        }
    }

    fn plan(req: &RequirementsSpec, fabric_spec: &FabricSpec) -> StageResult<ConstructionSpec> {
        ConstructionStage::new().process(ConstructionInput {
            requirements: req,
            fabric_spec,
        })
    }

    #[test]
    fn test_bordered_blanket_plan() {
        let req = requirements(48.0, 60.0);
        let spec = plan(&req, &fabric(stockinette(), true)).unwrap();

        let names: Vec<&str> = spec.construction_zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["border", "main_body"]);
        assert_eq!(
            spec.construction_sequence,
            vec![
                ConstructionStep::CastOn,
                ConstructionStep::BottomBorder,
                ConstructionStep::MainBodyWithSideBorders,
                ConstructionStep::TopBorder,
                ConstructionStep::BindOff,
                ConstructionStep::Finishing,
            ]
        );
        assert_eq!(
            spec.finishing_requirements,
            vec![FinishingStep::WeaveInEnds, FinishingStep::Blocking]
        );
        assert_eq!(spec.target_dimensions, req.dimensions);
    }

    #[test]
    fn test_borderless_plan_uses_plain_main_body() {
        let req = requirements(48.0, 60.0);
        let spec = plan(&req, &fabric(stockinette(), false)).unwrap();

        assert_eq!(spec.construction_zones.len(), 1);
        assert!(spec.construction_sequence.contains(&ConstructionStep::MainBody));
        assert!(!spec.construction_sequence.contains(&ConstructionStep::TopBorder));
    }

    #[test]
    fn test_cable_finishing_and_notes() {
        let req = requirements(60.0, 60.0);
        let spec = plan(&req, &fabric(simple_cable(), true)).unwrap();

        assert!(spec.finishing_requirements.contains(&FinishingStep::CableBlocking));
        assert!(spec
            .structural_notes
            .iter()
            .any(|n| n.starts_with("Large project")));
        assert!(spec
            .structural_notes
            .iter()
            .any(|n| n.contains("consistent tension")));
    }

    #[test]
    fn test_unnamed_main_pattern_rejected() {
        let req = requirements(48.0, 60.0);
        let mut main = stockinette();
        main.name.clear();

        let err = plan(&req, &fabric(main, true)).unwrap_err();
        assert!(matches!(err, StageError::Construction { ref construction_type, .. } if construction_type == "main_pattern_planning"));
    }
}
