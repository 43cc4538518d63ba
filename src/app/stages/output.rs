use crate::config::ConfigTables;
use crate::domain::model::{
    FabricSpec, OutputSummary, QuickStats, RenderedOutputs, RequirementsSpec, StitchResult,
    ValidationReport,
};
use crate::domain::ports::Stage;
use crate::utils::error::{PipelineStage, StageError, StageResult};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

const PATTERN_STITCHES_PER_HOUR: f64 = 200.0;
const PLAIN_STITCHES_PER_HOUR: f64 = 400.0;

pub struct OutputInput<'a> {
    pub requirements: &'a RequirementsSpec,
    pub fabric_spec: &'a FabricSpec,
    pub stitch_result: &'a StitchResult,
    pub validation: &'a ValidationReport,
    pub generated_at: DateTime<Utc>,
}

/// Renders the computed pattern into markdown, plain text, JSON and a short
/// summary. Nothing here changes a number the core computed.
pub struct OutputStage {
    tables: Arc<ConfigTables>,
}

impl OutputStage {
    pub fn new(tables: Arc<ConfigTables>) -> Self {
        Self { tables }
    }

    fn title(fabric_spec: &FabricSpec, requirements: &RequirementsSpec) -> String {
        format!(
            "{} {} ({})",
            fabric_spec.stitch_pattern.name,
            requirements.project_type.title(),
            requirements.dimensions
        )
    }

    fn estimated_yardage(&self, requirements: &RequirementsSpec, fabric_spec: &FabricSpec) -> u32 {
        self.tables.estimated_yardage(
            requirements.dimensions.area(),
            &fabric_spec.yarn_requirements.weight,
        )
    }

    fn render_markdown(&self, input: &OutputInput<'_>, yardage: u32) -> StageResult<String> {
        let OutputInput {
            requirements,
            fabric_spec,
            stitch_result,
            validation,
            generated_at,
        } = input;
        let yarn = &fabric_spec.yarn_requirements;
        let actual = stitch_result.actual_dimensions;
        let cast_on = stitch_result
            .stitch_instructions
            .first()
            .ok_or_else(|| StageError::Output {
                format: "markdown".to_string(),
                message: "stitch result has no instructions".to_string(),
            })?;

        let mut md = String::new();
        writeln!(md, "# {}", Self::title(fabric_spec, requirements)).map_err(fmt_error)?;
        writeln!(md).map_err(fmt_error)?;
        writeln!(md, "## Pattern Information").map_err(fmt_error)?;
        writeln!(md, "- **Project Type**: {}", requirements.project_type.title()).map_err(fmt_error)?;
        writeln!(
            md,
            "- **Finished Size**: {}\" wide x {}\" long",
            actual.width, actual.length
        )
        .map_err(fmt_error)?;
        writeln!(md, "- **Cast On**: {} stitches", stitch_result.cast_on_stitches).map_err(fmt_error)?;
        writeln!(md, "- **Total Rows**: {}", stitch_result.total_rows).map_err(fmt_error)?;
        writeln!(md, "- **Generated**: {}", generated_at.format("%Y-%m-%d %H:%M")).map_err(fmt_error)?;
        writeln!(md).map_err(fmt_error)?;

        writeln!(md, "## Materials").map_err(fmt_error)?;
        write!(md, "- **Yarn**: {} yards {} weight {} yarn", yardage, yarn.weight, yarn.fiber)
            .map_err(fmt_error)?;
        if let Some(color) = &yarn.color {
            write!(md, " in {}", color).map_err(fmt_error)?;
        }
        writeln!(md).map_err(fmt_error)?;
        writeln!(md, "- **Needles**: {}", self.tables.needle_size(&yarn.weight)).map_err(fmt_error)?;
        writeln!(
            md,
            "- **Gauge**: {} stitches and {} rows = 1 inch in {}",
            fabric_spec.gauge.stitches_per_inch,
            fabric_spec.gauge.rows_per_inch,
            fabric_spec.stitch_pattern.name
        )
        .map_err(fmt_error)?;
        writeln!(md).map_err(fmt_error)?;

        writeln!(md, "## Pattern Instructions").map_err(fmt_error)?;
        writeln!(md).map_err(fmt_error)?;
        writeln!(md, "### Cast On").map_err(fmt_error)?;
        writeln!(md, "{}", cast_on).map_err(fmt_error)?;
        writeln!(md).map_err(fmt_error)?;

        writeln!(md, "### Main Pattern: {}", fabric_spec.stitch_pattern.name).map_err(fmt_error)?;
        for (i, instruction) in fabric_spec.stitch_pattern.instructions.iter().enumerate() {
            writeln!(md, "{}. {}", i + 1, instruction).map_err(fmt_error)?;
        }
        writeln!(
            md,
            "\nRepeat rows 1-{} until piece measures desired length.",
            fabric_spec.stitch_pattern.row_repeat
        )
        .map_err(fmt_error)?;

        if let Some(border) = &fabric_spec.border_pattern {
            writeln!(md, "\n### Border: {}", border.name).map_err(fmt_error)?;
            for (i, instruction) in border.instructions.iter().enumerate() {
                writeln!(md, "{}. {}", i + 1, instruction).map_err(fmt_error)?;
            }
        }

        writeln!(md, "\n### Full Sequence").map_err(fmt_error)?;
        for (i, instruction) in stitch_result.stitch_instructions.iter().enumerate() {
            writeln!(md, "{}. {}", i + 1, instruction).map_err(fmt_error)?;
        }

        if !fabric_spec.construction_notes.is_empty() {
            writeln!(md, "\n## Construction Notes").map_err(fmt_error)?;
            for note in &fabric_spec.construction_notes {
                writeln!(md, "- {}", note).map_err(fmt_error)?;
            }
        }

        if !validation.errors().is_empty()
            || !validation.warnings().is_empty()
            || !validation.suggestions().is_empty()
        {
            writeln!(md, "\n## Pattern Notes").map_err(fmt_error)?;
            for error in validation.errors() {
                writeln!(md, "❌ **Error**: {}\n", error).map_err(fmt_error)?;
            }
            for warning in validation.warnings() {
                writeln!(md, "⚠️ **Warning**: {}\n", warning).map_err(fmt_error)?;
            }
            for suggestion in validation.suggestions() {
                writeln!(md, "💡 **Suggestion**: {}\n", suggestion).map_err(fmt_error)?;
            }
        }

        Ok(md)
    }

    fn render_text(&self, input: &OutputInput<'_>, yardage: u32) -> StageResult<String> {
        let OutputInput {
            requirements,
            fabric_spec,
            stitch_result,
            validation,
            ..
        } = input;
        let yarn = &fabric_spec.yarn_requirements;
        let title = Self::title(fabric_spec, requirements);

        let mut text = String::new();
        writeln!(text, "{}\n{}\n", title, "=".repeat(title.chars().count())).map_err(fmt_error)?;

        writeln!(text, "MATERIALS:").map_err(fmt_error)?;
        writeln!(text, "Yarn: {} yards {} weight {}", yardage, yarn.weight, yarn.fiber)
            .map_err(fmt_error)?;
        writeln!(text, "Needles: {}", self.tables.needle_size(&yarn.weight)).map_err(fmt_error)?;
        writeln!(
            text,
            "Gauge: {} sts and {} rows = 1 inch\n",
            fabric_spec.gauge.stitches_per_inch, fabric_spec.gauge.rows_per_inch
        )
        .map_err(fmt_error)?;

        writeln!(text, "FINISHED SIZE:").map_err(fmt_error)?;
        writeln!(
            text,
            "{}\" wide x {}\" long ({} stitches x {} rows)\n",
            stitch_result.actual_dimensions.width,
            stitch_result.actual_dimensions.length,
            stitch_result.cast_on_stitches,
            stitch_result.total_rows
        )
        .map_err(fmt_error)?;

        writeln!(text, "INSTRUCTIONS:").map_err(fmt_error)?;
        for (i, instruction) in stitch_result.stitch_instructions.iter().enumerate() {
            writeln!(text, "{}. {}", i + 1, instruction).map_err(fmt_error)?;
        }

        if !fabric_spec.construction_notes.is_empty() {
            writeln!(text, "\nNOTES:").map_err(fmt_error)?;
            for note in &fabric_spec.construction_notes {
                writeln!(text, "- {}", note).map_err(fmt_error)?;
            }
        }

        let findings = [
            ("ERROR", validation.errors()),
            ("WARNING", validation.warnings()),
            ("SUGGESTION", validation.suggestions()),
        ];
        if findings.iter().any(|(_, items)| !items.is_empty()) {
            writeln!(text, "\nVALIDATION:").map_err(fmt_error)?;
            for (label, items) in findings {
                for item in items {
                    writeln!(text, "{}: {}", label, item).map_err(fmt_error)?;
                }
            }
        }

        Ok(text)
    }

    fn render_json(&self, input: &OutputInput<'_>, yardage: u32) -> StageResult<serde_json::Value> {
        let OutputInput {
            requirements,
            fabric_spec,
            stitch_result,
            validation,
            generated_at,
        } = input;
        let yarn = &fabric_spec.yarn_requirements;
        let main = &fabric_spec.stitch_pattern;

        let border = fabric_spec.border_pattern.as_ref().map(|b| {
            json!({
                "name": b.name,
                "instructions": b.instructions,
            })
        });

        Ok(json!({
            "pattern_info": {
                "title": Self::title(fabric_spec, requirements),
                "project_type": requirements.project_type.as_str(),
                "generated_at": generated_at.to_rfc3339(),
            },
            "finished_size": {
                "width_inches": stitch_result.actual_dimensions.width,
                "length_inches": stitch_result.actual_dimensions.length,
            },
            "materials": {
                "yarn": {
                    "weight": yarn.weight,
                    "fiber": yarn.fiber,
                    "color": yarn.color,
                    "estimated_yardage": yardage,
                },
                "needles": self.tables.needle_size(&yarn.weight),
                "gauge": serde_json::to_value(fabric_spec.gauge)?,
            },
            "pattern_details": {
                "cast_on_stitches": stitch_result.cast_on_stitches,
                "total_rows": stitch_result.total_rows,
                "main_pattern": serde_json::to_value(main)?,
                "border_pattern": border,
            },
            "instructions": stitch_result.stitch_instructions,
            "construction_notes": fabric_spec.construction_notes,
            "dimension_validation": serde_json::to_value(&stitch_result.dimension_validation)?,
            "validation": serde_json::to_value(validation)?,
        }))
    }

    fn render_summary(&self, input: &OutputInput<'_>, yardage: u32) -> OutputSummary {
        let OutputInput {
            requirements,
            fabric_spec,
            stitch_result,
            validation,
            ..
        } = input;
        let yarn = &fabric_spec.yarn_requirements;

        OutputSummary {
            title: Self::title(fabric_spec, requirements),
            quick_stats: QuickStats {
                size: stitch_result.actual_dimensions.to_string(),
                yarn_needed: format!("{} yards {} weight {}", yardage, yarn.weight, yarn.fiber),
                estimated_time: estimate_knitting_time(stitch_result, fabric_spec),
            },
            key_techniques: identify_key_techniques(fabric_spec),
            warnings_count: validation.warnings().len(),
            suggestions_count: validation.suggestions().len(),
            is_valid: validation.is_valid(),
        }
    }
}

fn fmt_error(e: std::fmt::Error) -> StageError {
    StageError::Output {
        format: "text".to_string(),
        message: e.to_string(),
    }
}

fn is_pattern_work(fabric_spec: &FabricSpec) -> bool {
    matches!(
        fabric_spec.stitch_pattern.name.as_str(),
        "Simple Cable" | "Simple Lace"
    )
}

/// Rough hands-on time as a low-high range. Pattern work is assumed to go at
/// half the speed of plain knitting.
pub fn estimate_knitting_time(stitch_result: &StitchResult, fabric_spec: &FabricSpec) -> String {
    let total_stitches =
        f64::from(stitch_result.cast_on_stitches) * f64::from(stitch_result.total_rows);
    let rate = if is_pattern_work(fabric_spec) {
        PATTERN_STITCHES_PER_HOUR
    } else {
        PLAIN_STITCHES_PER_HOUR
    };
    let hours = total_stitches / rate;

    if hours < 10.0 {
        format!("{:.0}-{:.0} hours", hours, hours * 1.5)
    } else if hours < 50.0 {
        format!("{:.0}-{:.0} days", hours / 8.0, hours * 1.5 / 8.0)
    } else {
        format!("{:.0}-{:.0} weeks", hours / 40.0, hours * 1.5 / 40.0)
    }
}

pub fn identify_key_techniques(fabric_spec: &FabricSpec) -> Vec<String> {
    let mut techniques = vec!["cast on", "bind off"];
    let name = fabric_spec.stitch_pattern.name.as_str();

    if name.contains("Cable") {
        techniques.extend(["cables", "cable needle"]);
    }
    if name.contains("Lace") {
        techniques.extend(["yarn overs", "decreases"]);
    }
    if fabric_spec.border_pattern.is_some() {
        techniques.push("stitch patterns");
    }
    if name == "Stockinette" {
        techniques.extend(["knit", "purl"]);
    } else {
        techniques.push("pattern reading");
    }

    techniques.into_iter().map(String::from).collect()
}

impl<'a> Stage<'a> for OutputStage {
    type Input = OutputInput<'a>;
    type Output = RenderedOutputs;

    fn kind(&self) -> PipelineStage {
        PipelineStage::Output
    }

    fn agent(&self) -> &'static str {
        "output_renderer"
    }

    fn process(&self, input: OutputInput<'a>) -> StageResult<RenderedOutputs> {
        let yardage = self.estimated_yardage(input.requirements, input.fabric_spec);

        let outputs = RenderedOutputs {
            markdown: self.render_markdown(&input, yardage)?,
            text: self.render_text(&input, yardage)?,
            json: self.render_json(&input, yardage)?,
            summary: self.render_summary(&input, yardage),
        };

        tracing::debug!(
            "Rendered outputs: {} markdown bytes, {} text bytes, {} yards estimated",
            outputs.markdown.len(),
            outputs.text.len(),
            yardage
        );

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::stages::fabric::{seed_stitch_border, simple_cable, stockinette};
    use crate::domain::model::{Dimensions, Gauge, ProjectType, YarnSpec};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn requirements() -> RequirementsSpec {
        RequirementsSpec {
            project_type: ProjectType::Blanket,
            dimensions: Dimensions::new(48.0, 60.0),
            style_preferences: BTreeMap::new(),
            special_requirements: vec![],
        }
    }

    fn fabric(main: crate::domain::model::StitchPattern) -> FabricSpec {
        FabricSpec {
            stitch_pattern: main,
            border_pattern: Some(seed_stitch_border()),
            yarn_requirements: YarnSpec {
                weight: "worsted".to_string(),
                fiber: "wool".to_string(),
                color: Some("natural".to_string()),
            },
            gauge: Gauge::new(4.0, 5.5),
            construction_notes: vec!["Stockinette creates smooth, classic fabric".to_string()],
        }
    }

    fn stitch_result() -> StitchResult {
        StitchResult {
            cast_on_stitches: 200,
            total_rows: 330,
            actual_dimensions: Dimensions::new(50.0, 60.0),
            stitch_instructions: vec![
                "Cast on 200 stitches".to_string(),
                "Bind off all stitches loosely".to_string(),
            ],
            dimension_validation: None,
        }
    }

    fn render(
        fabric_spec: &FabricSpec,
        stitch_result: &StitchResult,
        validation: &ValidationReport,
    ) -> RenderedOutputs {
        let req = requirements();
        OutputStage::new(Arc::new(ConfigTables::default()))
            .process(OutputInput {
                requirements: &req,
                fabric_spec,
                stitch_result,
                validation,
                generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            })
            .unwrap()
    }

    #[test]
    fn test_renders_core_numbers_and_findings() {
        let validation = ValidationReport::new(
            vec!["Width calculation error".to_string()],
            vec!["Large project".to_string()],
            vec!["Consider blocking".to_string()],
        );
        let outputs = render(&fabric(stockinette()), &stitch_result(), &validation);

        assert!(outputs.markdown.starts_with("# Stockinette Blanket (48\" x 60\")"));
        assert!(outputs.markdown.contains("Cast on 200 stitches"));
        assert!(outputs.markdown.contains("**Total Rows**: 330"));
        assert!(outputs.markdown.contains("8640 yards worsted weight wool yarn in natural"));
        assert!(outputs.markdown.contains("2024-03-01 12:30"));
        assert!(outputs.markdown.contains("❌ **Error**: Width calculation error"));
        assert!(outputs.text.contains("ERROR: Width calculation error"));
        assert!(outputs.text.contains("WARNING: Large project"));
        assert!(outputs.text.contains("50\" wide x 60\" long"));
    }

    #[test]
    fn test_json_rendering_carries_unmodified_values() {
        let validation = ValidationReport::new(vec![], vec![], vec![]);
        let outputs = render(&fabric(stockinette()), &stitch_result(), &validation);

        let json = &outputs.json;
        assert_eq!(json["pattern_details"]["cast_on_stitches"], 200);
        assert_eq!(json["pattern_details"]["total_rows"], 330);
        assert_eq!(json["finished_size"]["width_inches"], 50.0);
        assert_eq!(json["materials"]["needles"], "US 8 (5mm)");
        assert_eq!(json["materials"]["yarn"]["estimated_yardage"], 8640);
        assert_eq!(json["validation"]["is_valid"], true);
        assert_eq!(json["pattern_details"]["border_pattern"]["name"], "Seed Stitch Border");
    }

    #[test]
    fn test_summary_counts_and_time_estimate() {
        let validation = ValidationReport::new(vec![], vec!["w".to_string()], vec![]);
        let outputs = render(&fabric(stockinette()), &stitch_result(), &validation);

        assert_eq!(outputs.summary.warnings_count, 1);
        assert_eq!(outputs.summary.suggestions_count, 0);
        assert!(outputs.summary.is_valid);
        // 66000 stitches at 400/h = 165 hours
        assert_eq!(outputs.summary.quick_stats.estimated_time, "4-6 weeks");
        assert_eq!(
            outputs.summary.key_techniques,
            vec!["cast on", "bind off", "stitch patterns", "knit", "purl"]
        );
    }

    #[test]
    fn test_time_estimate_buckets() {
        let plain = fabric(stockinette());
        let mut result = stitch_result();

        result.cast_on_stitches = 40;
        result.total_rows = 50;
        assert_eq!(estimate_knitting_time(&result, &plain), "5-8 hours");

        result.cast_on_stitches = 100;
        result.total_rows = 100;
        assert_eq!(estimate_knitting_time(&result, &plain), "3-5 days");

        // cable work is counted at half speed: 50 hours
        assert_eq!(estimate_knitting_time(&result, &fabric(simple_cable())), "1-2 weeks");
    }

    #[test]
    fn test_cable_techniques() {
        let techniques = identify_key_techniques(&fabric(simple_cable()));
        assert!(techniques.contains(&"cables".to_string()));
        assert!(techniques.contains(&"pattern reading".to_string()));
        assert!(!techniques.contains(&"purl".to_string()));
    }
}
