//! Typed calls to the translation service endpoints

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::core::client::{ApiClient, ApiResponse, RequestOptions};
use crate::core::errors::{Result, SyncError};
use crate::core::models::{
    CreateJobRequest, CreateJobResponse, JobPlanRequest, JobProgress, PlanDiff,
};
use crate::core::poller::ProgressSource;

const GENERATE_PLAN_PATH: &str = "/translation-jobs/generate-plan-from-entire-files";
const CREATE_JOB_PATH: &str = "/translation-jobs/create-with-parsed-files";

fn progress_path(job_id: &str) -> String {
    format!("/translation-jobs/{}/translation-progress", job_id)
}

fn translations_object_path(project_id: &str) -> String {
    format!("/projects/{}/translations-object", project_id)
}

/// Client for the translation-jobs and projects endpoints
#[derive(Debug, Clone)]
pub struct TranslationService {
    client: ApiClient,
}

impl TranslationService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Submit a plan and summarise the diff the service computed
    pub async fn generate_plan(&self, plan: &JobPlanRequest) -> Result<PlanDiff> {
        info!(
            "Submitting plan: {} files, {} target locales",
            plan.files_metadata.len(),
            plan.target_locale_isos.len()
        );
        let response = self
            .client
            .authenticated_post(GENERATE_PLAN_PATH, plan, RequestOptions::default())
            .await?;
        let response = require_authorized(response)?;
        Ok(PlanDiff::from_response(response.data))
    }

    /// Create the job server-side and return its id
    pub async fn create_job(&self, request: &CreateJobRequest) -> Result<String> {
        info!(
            "Creating translation job {} ({} files)",
            request.translation_job_uuid,
            request.parsed_files.len()
        );
        let response = self
            .client
            .authenticated_post(CREATE_JOB_PATH, request, RequestOptions::default())
            .await?;
        let created: CreateJobResponse = decode(require_authorized(response)?)?;
        Ok(created.translation_job_id)
    }

    pub async fn fetch_progress(&self, job_id: &str) -> Result<JobProgress> {
        let response = self
            .client
            .authenticated_get(&progress_path(job_id), RequestOptions::default())
            .await?;
        let progress: JobProgress = decode(require_authorized(response)?)?;
        debug!(
            "Job {}: {}/{}",
            job_id, progress.translations_completed, progress.translations_total
        );
        Ok(progress)
    }

    /// Fetch the project's full translations object
    pub async fn fetch_translations_object(&self, project_id: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .authenticated_get(&translations_object_path(project_id), RequestOptions::default())
            .await?;
        let status = response.status;
        let mut data = require_authorized(response)?.data;

        data.get_mut("translations_object")
            .map(serde_json::Value::take)
            .ok_or_else(|| SyncError::malformed(status, "missing translations_object"))
    }
}

#[async_trait]
impl ProgressSource for TranslationService {
    async fn fetch_progress(&self, job_id: &str) -> Result<JobProgress> {
        TranslationService::fetch_progress(self, job_id).await
    }
}

fn require_authorized(response: ApiResponse) -> Result<ApiResponse> {
    if response.is_unauthorized() {
        return Err(SyncError::Unauthorized);
    }
    Ok(response)
}

fn decode<T: DeserializeOwned>(response: ApiResponse) -> Result<T> {
    let status = response.status;
    serde_json::from_value(response.data)
        .map_err(|e| SyncError::malformed(status, format!("unexpected response shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::{Reply, ScriptedTransport};
    use crate::core::client::{ApiClientConfig, Method};
    use crate::core::models::LocaleCode;
    use serde_json::json;
    use std::sync::Arc;

    fn service(transport: Arc<ScriptedTransport>, token: Option<&str>) -> TranslationService {
        let mut config = ApiClientConfig::new("https://api.test");
        if let Some(token) = token {
            config = config.with_token(token);
        }
        TranslationService::new(ApiClient::with_transport(config, transport))
    }

    fn plan() -> JobPlanRequest {
        JobPlanRequest {
            project_uuid: "proj-1".to_string(),
            source_locale_iso: LocaleCode::parse("en").unwrap(),
            target_locale_isos: vec![LocaleCode::parse("fr").unwrap()],
            files_metadata: vec![],
        }
    }

    #[tokio::test]
    async fn test_generate_plan_posts_to_plan_endpoint() {
        let transport = ScriptedTransport::new(vec![Reply::Json(
            200,
            json!({"added_files": ["a.md"], "unchanged_files": 2}),
        )]);
        let service = service(transport.clone(), Some("tok"));

        let diff = service.generate_plan(&plan()).await.unwrap();
        assert_eq!(diff.added, 1);
        assert_eq!(diff.unchanged, 2);

        let sent = transport.request(0);
        assert_eq!(sent.method, Method::Post);
        assert_eq!(
            sent.url,
            "https://api.test/translation-jobs/generate-plan-from-entire-files"
        );
        assert_eq!(sent.body.unwrap()["source_locale_iso"], json!("en"));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let transport = ScriptedTransport::new(vec![]);
        let service = service(transport.clone(), None);

        let err = service.generate_plan(&plan()).await.unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_and_translations_endpoints() {
        let transport = ScriptedTransport::new(vec![
            Reply::Json(200, json!({"translations_total": 4, "translations_completed": 1})),
            Reply::Json(200, json!({"translations_object": {"fr": {"hello": "bonjour"}}})),
        ]);
        let service = service(transport.clone(), Some("tok"));

        let progress = service.fetch_progress("job-9").await.unwrap();
        assert_eq!(progress.translations_total, 4);
        assert_eq!(progress.translations_completed, 1);

        let object = service.fetch_translations_object("proj-1").await.unwrap();
        assert_eq!(object, json!({"fr": {"hello": "bonjour"}}));

        assert_eq!(
            transport.request(0).url,
            "https://api.test/translation-jobs/job-9/translation-progress"
        );
        assert_eq!(
            transport.request(1).url,
            "https://api.test/projects/proj-1/translations-object"
        );
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_server_errors() {
        let transport = ScriptedTransport::new(vec![
            Reply::Json(200, json!({"translations_total": "many"})),
            Reply::Json(200, json!({"something_else": true})),
            Reply::Json(200, json!({})),
        ]);
        let service = service(transport, Some("tok"));

        assert!(matches!(
            service.fetch_progress("job-1").await,
            Err(SyncError::Server { .. })
        ));
        assert!(matches!(
            service.fetch_translations_object("proj-1").await,
            Err(SyncError::Server { .. })
        ));

        let request = crate::core::plan::build_create_job_request(&plan(), "uuid", vec![], "name");
        assert!(matches!(
            service.create_job(&request).await,
            Err(SyncError::Server { .. })
        ));
    }
}
