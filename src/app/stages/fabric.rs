use crate::config::ConfigTables;
use crate::domain::model::{FabricSpec, Gauge, RequirementsSpec, StitchPattern, Texture, YarnSpec};
use crate::domain::ports::Stage;
use crate::utils::error::{PipelineStage, StageError, StageResult};
use std::sync::Arc;

pub struct FabricInput<'a> {
    pub requirements: &'a RequirementsSpec,
}

pub fn stockinette() -> StitchPattern {
    StitchPattern::new("Stockinette", 2, 1, &["Row 1: Knit", "Row 2: Purl"])
}

pub fn simple_cable() -> StitchPattern {
    StitchPattern::new(
        "Simple Cable",
        8,
        12,
        &[
            "Row 1: *K4, C4F, K4; rep from *",
            "Row 2 and all even rows: Purl",
            "Row 3: Knit",
            "Row 5: *K4, C4F, K4; rep from *",
            "Row 7: Knit",
        ],
    )
}

pub fn simple_lace() -> StitchPattern {
    StitchPattern::new(
        "Simple Lace",
        4,
        8,
        &[
            "Row 1: *K2, yo, k2tog, k2, ssk, yo; rep from *",
            "Row 2: Purl",
            "Row 3: *K1, yo, k2tog, k2, ssk, yo, k1; rep from *",
            "Row 4: Purl",
        ],
    )
}

pub fn seed_stitch_border() -> StitchPattern {
    StitchPattern::new(
        "Seed Stitch Border",
        2,
        2,
        &["Row 1: *K1, p1; rep from *", "Row 2: *P1, k1; rep from *"],
    )
}

/// Picks yarn, stitch patterns and gauge for the requested texture.
pub struct FabricStage {
    tables: Arc<ConfigTables>,
}

impl FabricStage {
    pub fn new(tables: Arc<ConfigTables>) -> Self {
        Self { tables }
    }

    fn select_stitch_pattern(&self, texture: Texture) -> StitchPattern {
        match texture {
            Texture::Cable => simple_cable(),
            Texture::Lace => simple_lace(),
            Texture::Simple => stockinette(),
        }
    }

    fn calculate_gauge(&self, yarn_weight: &str) -> StageResult<Gauge> {
        if yarn_weight.trim().is_empty() {
            return Err(StageError::Gauge {
                yarn_weight: yarn_weight.to_string(),
                message: "Cannot calculate gauge: yarn weight is empty".to_string(),
            });
        }

        self.tables
            .gauge_for(yarn_weight)
            .ok_or_else(|| StageError::Gauge {
                yarn_weight: yarn_weight.to_string(),
                message: format!(
                    "Unsupported yarn weight. Supported weights: {}",
                    self.tables.supported_weights().join(", ")
                ),
            })
    }

    fn create_construction_notes(&self, texture: Texture) -> Vec<String> {
        let notes: [&str; 2] = match texture {
            Texture::Cable => [
                "Cables provide structure and warmth",
                "Block finished piece to even out cable tension",
            ],
            Texture::Lace => [
                "Lace creates drape and lightweight feel",
                "Consider using larger needles for more open fabric",
            ],
            Texture::Simple => [
                "Stockinette creates smooth, classic fabric",
                "Consider adding garter stitch edges to prevent curling",
            ],
        };
        notes.iter().map(|n| n.to_string()).collect()
    }

    fn validate_fabric_spec(
        &self,
        yarn: &YarnSpec,
        patterns: &[&StitchPattern],
        gauge: &Gauge,
    ) -> StageResult<()> {
        if yarn.weight.is_empty() || yarn.fiber.is_empty() {
            return Err(StageError::Fabric {
                message: format!(
                    "Incomplete yarn specification: weight={:?}, fiber={:?}",
                    yarn.weight, yarn.fiber
                ),
            });
        }

        for pattern in patterns {
            if pattern.name.is_empty() || pattern.instructions.is_empty() {
                return Err(StageError::Fabric {
                    message: format!(
                        "Invalid stitch pattern: name={:?}, instructions_count={}",
                        pattern.name,
                        pattern.instructions.len()
                    ),
                });
            }
            if pattern.row_repeat == 0 || pattern.stitch_repeat == 0 {
                return Err(StageError::Fabric {
                    message: format!(
                        "Invalid stitch pattern repeats for {}: row_repeat={}, stitch_repeat={}",
                        pattern.name, pattern.row_repeat, pattern.stitch_repeat
                    ),
                });
            }
        }

        if !(gauge.stitches_per_inch > 0.0 && gauge.rows_per_inch > 0.0) {
            return Err(StageError::Gauge {
                yarn_weight: yarn.weight.clone(),
                message: format!(
                    "Invalid gauge values: stitches_per_inch={}, rows_per_inch={}",
                    gauge.stitches_per_inch, gauge.rows_per_inch
                ),
            });
        }

        Ok(())
    }
}

impl<'a> Stage<'a> for FabricStage {
    type Input = FabricInput<'a>;
    type Output = FabricSpec;

    fn kind(&self) -> PipelineStage {
        PipelineStage::Fabric
    }

    fn agent(&self) -> &'static str {
        "fabric_designer"
    }

    fn process(&self, input: FabricInput<'a>) -> StageResult<FabricSpec> {
        let texture = input.requirements.texture()?;

        let yarn = self.tables.default_yarn();
        let stitch_pattern = self.select_stitch_pattern(texture);
        // every blanket gets a border
        let border_pattern = seed_stitch_border();
        let gauge = self.calculate_gauge(&yarn.weight)?;
        let construction_notes = self.create_construction_notes(texture);

        self.validate_fabric_spec(&yarn, &[&stitch_pattern, &border_pattern], &gauge)?;

        tracing::debug!(
            "Selected {} with {} border, {} {} at {} sts/{} rows per inch",
            stitch_pattern.name,
            border_pattern.name,
            yarn.weight,
            yarn.fiber,
            gauge.stitches_per_inch,
            gauge.rows_per_inch
        );

        Ok(FabricSpec {
            stitch_pattern,
            border_pattern: Some(border_pattern),
            yarn_requirements: yarn,
            gauge,
            construction_notes,
        })
    }
}
