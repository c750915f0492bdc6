use crate::{
    error::{AppError, AppResult},
    models::Metadata,
    services::providers::MetadataProvider,
};

/// Stand-in provider used when no metadata API key is configured
#[derive(Debug, Clone, Default)]
pub struct DisabledProvider;

#[async_trait::async_trait]
impl MetadataProvider for DisabledProvider {
    async fn fetch(&self, _title: &str) -> AppResult<Option<Metadata>> {
        Err(AppError::ProviderUnavailable(
            "metadata API key not configured".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
