use crate::config::ConfigTables;
use crate::domain::model::{Dimensions, ProjectType, RequirementsSpec, Texture};
use crate::domain::ports::Stage;
use crate::utils::error::{PipelineStage, StageError, StageResult};
use crate::utils::validation::validate_non_empty_string;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct RequirementsInput<'a> {
    pub user_request: &'a str,
}

/// Keyword-level request parser. Dimensions always come from the configured
/// default pair; only the texture is read from the request text.
pub struct RequirementsStage {
    tables: Arc<ConfigTables>,
}

impl RequirementsStage {
    pub fn new(tables: Arc<ConfigTables>) -> Self {
        Self { tables }
    }

    fn extract_project_type(&self, _request: &str) -> ProjectType {
        ProjectType::Blanket
    }

    fn extract_dimensions(&self) -> StageResult<Dimensions> {
        let dimensions = self.tables.default_dimensions();
        let max = self.tables.requirements.max_dimension;

        if !(dimensions.width > 0.0 && dimensions.length > 0.0) {
            return Err(StageError::Requirements {
                message: format!(
                    "Invalid dimensions: width={}, length={}. Dimensions must be positive numbers.",
                    dimensions.width, dimensions.length
                ),
            });
        }

        if dimensions.width > max || dimensions.length > max {
            return Err(StageError::Requirements {
                message: format!(
                    "Dimensions too large: width={}, length={}. Maximum supported size is {} inches.",
                    dimensions.width, dimensions.length, max
                ),
            });
        }

        Ok(dimensions)
    }

    fn extract_texture(&self, request: &str) -> Texture {
        let request_lower = request.to_lowercase();
        if request_lower.contains("cable") {
            Texture::Cable
        } else if request_lower.contains("lace") {
            Texture::Lace
        } else {
            Texture::Simple
        }
    }

    fn validate_requirements(
        &self,
        project_type: ProjectType,
        dimensions: &Dimensions,
    ) -> StageResult<()> {
        let min = self.tables.requirements.min_blanket_dimension;
        if project_type == ProjectType::Blanket && (dimensions.width < min || dimensions.length < min)
        {
            return Err(StageError::Requirements {
                message: format!(
                    "Blanket too small: {}. Minimum blanket size is {}\" x {}\".",
                    dimensions, min, min
                ),
            });
        }
        Ok(())
    }
}

impl<'a> Stage<'a> for RequirementsStage {
    type Input = RequirementsInput<'a>;
    type Output = RequirementsSpec;

    fn kind(&self) -> PipelineStage {
        PipelineStage::Requirements
    }

    fn agent(&self) -> &'static str {
        "requirements_parser"
    }

    fn process(&self, input: RequirementsInput<'a>) -> StageResult<RequirementsSpec> {
        validate_non_empty_string("user_request", input.user_request)?;

        let project_type = self.extract_project_type(input.user_request);
        let dimensions = self.extract_dimensions()?;
        let texture = self.extract_texture(input.user_request);
        self.validate_requirements(project_type, &dimensions)?;

        let mut style_preferences = BTreeMap::new();
        style_preferences.insert(Texture::KEY.to_string(), texture.as_str().to_string());

        tracing::debug!(
            "Parsed request: {} {} with {} texture",
            dimensions,
            project_type.as_str(),
            texture.as_str()
        );

        Ok(RequirementsSpec {
            project_type,
            dimensions,
            style_preferences,
            special_requirements: Vec::new(),
        })
    }
}
