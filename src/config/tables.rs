use crate::domain::model::{Dimensions, Gauge, YarnSpec};
use crate::utils::error::{PatternError, Result, StageError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_NEEDLE: &str = "US 8 (5mm)";
const DEFAULT_YARDAGE_FACTOR: f64 = 2.5;

/// Read-only lookup data shared by every stage of a run.
///
/// Each section is optional in TOML; a missing section keeps the built-in
/// defaults. Provided maps replace the defaults wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigTables {
    pub requirements: RequirementsConfig,
    pub yarn: YarnConfig,
    pub gauges: BTreeMap<String, GaugeEntry>,
    pub needles: NeedleConfig,
    pub yardage: YardageConfig,
    pub gauge_ranges: BTreeMap<String, GaugeRange>,
    pub skill_rules: Vec<SkillRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementsConfig {
    pub default_width: f64,
    pub default_length: f64,
    pub max_dimension: f64,
    pub min_blanket_dimension: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YarnConfig {
    pub weight: String,
    pub fiber: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeEntry {
    pub stitches_per_inch: f64,
    pub rows_per_inch: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedleConfig {
    pub fallback: String,
    pub sizes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YardageConfig {
    pub fallback_per_square_inch: f64,
    pub waste_factor: f64,
    pub per_square_inch: BTreeMap<String, f64>,
}

/// Typical stitches-per-inch band for a yarn weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeRange {
    pub min: f64,
    pub max: f64,
}

impl GaugeRange {
    pub fn contains(&self, stitches_per_inch: f64) -> bool {
        self.min <= stitches_per_inch && stitches_per_inch <= self.max
    }
}

/// A pattern/yarn pairing that is known to be hard to work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRule {
    pub patterns: Vec<String>,
    pub yarn_weight: String,
    pub warning: String,
}

impl SkillRule {
    pub fn applies_to(&self, pattern_name: &str, yarn_weight: &str) -> bool {
        self.yarn_weight == yarn_weight && self.patterns.iter().any(|p| p == pattern_name)
    }
}

impl Default for RequirementsConfig {
    fn default() -> Self {
        Self {
            default_width: 48.0,
            default_length: 60.0,
            max_dimension: 200.0,
            min_blanket_dimension: 12.0,
        }
    }
}

impl Default for YarnConfig {
    fn default() -> Self {
        Self {
            weight: "worsted".to_string(),
            fiber: "wool".to_string(),
            color: Some("natural".to_string()),
        }
    }
}

impl Default for NeedleConfig {
    fn default() -> Self {
        let sizes = [
            ("fingering", "US 3 (3.25mm)"),
            ("dk", "US 6 (4mm)"),
            ("worsted", "US 8 (5mm)"),
            ("chunky", "US 11 (8mm)"),
        ];
        Self {
            fallback: DEFAULT_NEEDLE.to_string(),
            sizes: sizes
                .iter()
                .map(|(w, s)| (w.to_string(), s.to_string()))
                .collect(),
        }
    }
}

impl Default for YardageConfig {
    fn default() -> Self {
        let factors = [("worsted", 2.5), ("dk", 3.0), ("fingering", 4.0)];
        Self {
            fallback_per_square_inch: DEFAULT_YARDAGE_FACTOR,
            waste_factor: 1.2,
            per_square_inch: factors.iter().map(|(w, f)| (w.to_string(), *f)).collect(),
        }
    }
}

impl Default for ConfigTables {
    fn default() -> Self {
        let gauges = [("worsted", 4.0, 5.5), ("dk", 5.0, 6.0), ("fingering", 7.0, 8.0)]
            .iter()
            .map(|(w, s, r)| {
                (
                    w.to_string(),
                    GaugeEntry {
                        stitches_per_inch: *s,
                        rows_per_inch: *r,
                    },
                )
            })
            .collect();

        let gauge_ranges = [
            ("fingering", 6.0, 8.0),
            ("dk", 4.5, 6.0),
            ("worsted", 3.5, 5.0),
            ("chunky", 2.0, 4.0),
        ]
        .iter()
        .map(|(w, min, max)| (w.to_string(), GaugeRange { min: *min, max: *max }))
        .collect();

        let skill_rules = vec![
            SkillRule {
                patterns: vec!["Simple Cable".to_string(), "Simple Lace".to_string()],
                yarn_weight: "fingering".to_string(),
                warning: "Fingering weight yarn with intermediate patterns may be challenging - \
                          consider DK or worsted for easier handling"
                    .to_string(),
            },
            SkillRule {
                patterns: vec!["Complex Cable".to_string(), "Complex Lace".to_string()],
                yarn_weight: "chunky".to_string(),
                warning: "Advanced patterns may not show well in chunky yarn - \
                          consider finer weights for better pattern definition"
                    .to_string(),
            },
        ];

        Self {
            requirements: RequirementsConfig::default(),
            yarn: YarnConfig::default(),
            gauges,
            needles: NeedleConfig::default(),
            yardage: YardageConfig::default(),
            gauge_ranges,
            skill_rules,
        }
    }
}

impl ConfigTables {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| PatternError::config("toml_parsing", format!("TOML parsing error: {}", e)))
    }

    /// Replaces `${VAR}` with the value of the environment variable; unknown
    /// variables are left untouched.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| PatternError::config("env_substitution", e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn default_dimensions(&self) -> Dimensions {
        Dimensions::new(
            self.requirements.default_width,
            self.requirements.default_length,
        )
    }

    pub fn default_yarn(&self) -> YarnSpec {
        YarnSpec {
            weight: self.yarn.weight.clone(),
            fiber: self.yarn.fiber.clone(),
            color: self.yarn.color.clone(),
        }
    }

    pub fn gauge_for(&self, yarn_weight: &str) -> Option<Gauge> {
        self.gauges
            .get(&yarn_weight.to_lowercase())
            .map(|g| Gauge::new(g.stitches_per_inch, g.rows_per_inch))
    }

    pub fn supported_weights(&self) -> Vec<&str> {
        self.gauges.keys().map(String::as_str).collect()
    }

    pub fn needle_size(&self, yarn_weight: &str) -> &str {
        self.needles
            .sizes
            .get(yarn_weight)
            .unwrap_or(&self.needles.fallback)
    }

    pub fn yardage_factor(&self, yarn_weight: &str) -> f64 {
        self.yardage
            .per_square_inch
            .get(yarn_weight)
            .copied()
            .unwrap_or(self.yardage.fallback_per_square_inch)
    }

    /// Estimated yards for `area` square inches, waste allowance included.
    pub fn estimated_yardage(&self, area: f64, yarn_weight: &str) -> u32 {
        let base = (area * self.yardage_factor(yarn_weight)).floor();
        (base * self.yardage.waste_factor).floor() as u32
    }

    pub fn gauge_range(&self, yarn_weight: &str) -> Option<&GaugeRange> {
        self.gauge_ranges.get(yarn_weight)
    }

    pub fn validate_config(&self) -> Result<()> {
        let as_config = |e: StageError| {
            let message = e.to_string();
            match e {
                StageError::InvalidInput { field, .. } => PatternError::config(&field, message),
                _ => PatternError::config("tables", message),
            }
        };

        let req = &self.requirements;
        validation::validate_positive("requirements.max_dimension", req.max_dimension)
            .map_err(as_config)?;
        validation::validate_range(
            "requirements.default_width",
            req.default_width,
            f64::MIN_POSITIVE,
            req.max_dimension,
        )
        .map_err(as_config)?;
        validation::validate_range(
            "requirements.default_length",
            req.default_length,
            f64::MIN_POSITIVE,
            req.max_dimension,
        )
        .map_err(as_config)?;

        for (weight, gauge) in &self.gauges {
            validation::validate_positive(
                &format!("gauges.{}.stitches_per_inch", weight),
                gauge.stitches_per_inch,
            )
            .map_err(as_config)?;
            validation::validate_positive(
                &format!("gauges.{}.rows_per_inch", weight),
                gauge.rows_per_inch,
            )
            .map_err(as_config)?;
        }

        validation::validate_positive(
            "yardage.fallback_per_square_inch",
            self.yardage.fallback_per_square_inch,
        )
        .map_err(as_config)?;
        for (weight, factor) in &self.yardage.per_square_inch {
            validation::validate_positive(&format!("yardage.per_square_inch.{}", weight), *factor)
                .map_err(as_config)?;
        }
        if !(self.yardage.waste_factor >= 1.0) {
            return Err(PatternError::config(
                "yardage.waste_factor",
                format!("must be at least 1.0, got {}", self.yardage.waste_factor),
            ));
        }

        validation::validate_non_empty_string("yarn.weight", &self.yarn.weight).map_err(as_config)?;
        validation::validate_non_empty_string("yarn.fiber", &self.yarn.fiber).map_err(as_config)?;

        for (i, rule) in self.skill_rules.iter().enumerate() {
            validation::validate_non_empty_list(&format!("skill_rules[{}].patterns", i), &rule.patterns)
                .map_err(as_config)?;
            validation::validate_non_empty_string(&format!("skill_rules[{}].warning", i), &rule.warning)
                .map_err(as_config)?;
        }

        for (weight, range) in &self.gauge_ranges {
            if !(range.min <= range.max) {
                return Err(PatternError::config(
                    &format!("gauge_ranges.{}", weight),
                    format!("min {} is greater than max {}", range.min, range.max),
                ));
            }
        }

        Ok(())
    }
}

impl Validate for ConfigTables {
    type Error = PatternError;

    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
