//! Plan, run and pull translation jobs for one documentation project

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::core::client::ApiClient;
use crate::core::config::SyncConfig;
use crate::core::errors::{Result, SyncError};
use crate::core::hasher::{hash_file, parse_file};
use crate::core::models::{FileMetadata, JobPlanRequest, JobProgress, LocaleCode, PlanDiff};
use crate::core::plan::{build_create_job_request, build_job_plan, default_job_name};
use crate::core::poller::{
    PollCancelHandle, PollOutcome, PollerConfig, ProgressPoller, ProgressSink,
};
use crate::core::service::TranslationService;
use crate::sync::locales::collect_source_files;

/// File the pulled translations are written to inside the save directory
pub const TRANSLATIONS_FILE: &str = "translations.json";

/// Inputs for one project run
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub project_id: String,
    pub source_locale: LocaleCode,
    pub target_locales: Vec<LocaleCode>,
    pub source_files: Vec<PathBuf>,
    pub save_dir: PathBuf,
    /// Previously pulled translations, compared against each new pull
    pub load_path: Option<PathBuf>,
}

impl JobSettings {
    /// Resolve settings from configuration, scanning content directories
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let explicit: Vec<PathBuf> = config
            .source_files
            .iter()
            .chain(config.string_files.iter())
            .cloned()
            .collect();

        Ok(Self {
            project_id: config.project_id.clone(),
            source_locale: config.default_locale.clone(),
            target_locales: config.target_locales(),
            source_files: collect_source_files(&explicit, &config.content_dirs)?,
            save_dir: config.translations_save_path.clone(),
            load_path: config.translations_load_path.clone(),
        })
    }
}

/// Result of a dry run
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub request: JobPlanRequest,
    pub diff: PlanDiff,
}

/// Result of pulling the translations object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub saved_to: PathBuf,
    /// Top-level locale keys that are new or differ from the loaded translations
    pub changed_locales: Vec<String>,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub job_id: String,
    pub diff: PlanDiff,
    pub progress: JobProgress,
    pub pull: PullReport,
}

/// Sequences hashing, plan submission, job creation, polling and persistence
#[derive(Debug)]
pub struct TranslationOrchestrator {
    service: TranslationService,
    settings: JobSettings,
    poller_config: PollerConfig,
    cancel: PollCancelHandle,
}

impl TranslationOrchestrator {
    pub fn new(
        service: TranslationService,
        settings: JobSettings,
        poller_config: PollerConfig,
    ) -> Self {
        Self {
            service,
            settings,
            poller_config,
            cancel: PollCancelHandle::new(),
        }
    }

    /// Validate configuration and build an orchestrator over the real HTTP client
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        let client = ApiClient::new(config.api_client_config())?;
        Ok(Self::new(
            TranslationService::new(client),
            JobSettings::from_config(config)?,
            config.poller_config(),
        ))
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Handle that stops an in-progress run.
    ///
    /// Cancellation is permanent: once triggered, every later `execute` or
    /// `execute_plan` on this orchestrator fails with `Cancelled` before
    /// creating a job.
    pub fn cancel_handle(&self) -> PollCancelHandle {
        self.cancel.clone()
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!("Run cancelled, no translation job created");
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Fingerprint every configured source file, in order
    pub async fn collect_metadata(&self) -> Result<Vec<FileMetadata>> {
        let mut metadata = Vec::with_capacity(self.settings.source_files.len());
        for path in &self.settings.source_files {
            metadata.push(hash_file(path).await?);
        }
        Ok(metadata)
    }

    fn plan_request(&self, files_metadata: Vec<FileMetadata>) -> JobPlanRequest {
        build_job_plan(
            &self.settings.project_id,
            &self.settings.source_locale,
            &self.settings.target_locales,
            files_metadata,
        )
    }

    /// Dry run: submit the plan and report the diff without creating a job
    pub async fn plan(&self) -> Result<PlanReport> {
        let request = self.plan_request(self.collect_metadata().await?);
        let diff = self.service.generate_plan(&request).await?;
        info!("Plan for project {}: {}", self.settings.project_id, diff);
        Ok(PlanReport { request, diff })
    }

    /// Full run: plan, create the job, poll it to completion, pull translations
    pub async fn execute(&self, sink: &mut dyn ProgressSink) -> Result<ExecutionReport> {
        self.ensure_not_cancelled()?;
        let report = self.plan().await?;
        self.execute_plan(&report, sink).await
    }

    /// Create a job for an already submitted plan and see it through.
    ///
    /// Source files are re-read for their content; if any fingerprint no
    /// longer matches the plan the run stops before creating a job.
    pub async fn execute_plan(
        &self,
        report: &PlanReport,
        sink: &mut dyn ProgressSink,
    ) -> Result<ExecutionReport> {
        self.ensure_not_cancelled()?;

        let mut parsed_files = Vec::with_capacity(self.settings.source_files.len());
        for path in &self.settings.source_files {
            parsed_files.push(parse_file(path).await?);
        }

        let planned = &report.request.files_metadata;
        let unchanged = planned.len() == parsed_files.len()
            && planned
                .iter()
                .zip(&parsed_files)
                .all(|(meta, file)| meta.file_hash == file.file_hash);
        if !unchanged {
            return Err(SyncError::validation(
                "source files changed since the plan was generated",
            ));
        }

        let create = build_create_job_request(
            &report.request,
            Uuid::new_v4().to_string(),
            parsed_files,
            default_job_name(Utc::now()),
        );
        self.ensure_not_cancelled()?;
        let job_id = self.service.create_job(&create).await?;
        info!("Created translation job {}", job_id);

        match self.finish_job(&job_id, sink).await {
            Ok((progress, pull)) => Ok(ExecutionReport {
                job_id,
                diff: report.diff.clone(),
                progress,
                pull,
            }),
            Err(e) => {
                error!("Translation job {} was created but not finished: {}", job_id, e);
                Err(SyncError::JobIncomplete {
                    job_id,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn finish_job(
        &self,
        job_id: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<(JobProgress, PullReport)> {
        let mut poller = ProgressPoller::with_cancel(
            self.service.clone(),
            self.poller_config.clone(),
            self.cancel.clone(),
        );

        let progress = match poller.poll_until_done(job_id, sink).await? {
            PollOutcome::Completed(progress) => progress,
            PollOutcome::Cancelled { .. } => return Err(SyncError::Cancelled),
        };

        let pull = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(SyncError::Cancelled),
            pull = self.pull() => pull?,
        };
        Ok((progress, pull))
    }

    /// Fetch the project's translations object and write it to disk.
    ///
    /// When a load path is configured, the new object is compared with the
    /// translations found there.
    pub async fn pull(&self) -> Result<PullReport> {
        let previous = match &self.settings.load_path {
            Some(path) => load_existing_translations(path).await?,
            None => None,
        };

        let translations = self
            .service
            .fetch_translations_object(&self.settings.project_id)
            .await?;
        let changed_locales = changed_locales(previous.as_ref(), &translations);
        let saved_to = save_translations(&self.settings.save_dir, &translations).await?;

        info!("{} locales changed since last pull", changed_locales.len());
        Ok(PullReport {
            saved_to,
            changed_locales,
        })
    }
}

/// Write `translations` as pretty JSON to `<dir>/translations.json`
pub async fn save_translations(dir: &Path, translations: &serde_json::Value) -> Result<PathBuf> {
    if !dir.exists() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| SyncError::file(dir, e))?;
    }

    let path = dir.join(TRANSLATIONS_FILE);
    let content = serde_json::to_string_pretty(translations)?;
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| SyncError::file(&path, e))?;

    info!("Saved translations to {}", path.display());
    Ok(path)
}

fn translations_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(TRANSLATIONS_FILE)
    } else {
        path.to_path_buf()
    }
}

/// Read a previously saved translations file, or `translations.json` inside a directory
pub async fn load_translations(path: &Path) -> Result<serde_json::Value> {
    let path = translations_path(path);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| SyncError::file(&path, e))?;
    Ok(serde_json::from_str(&content)?)
}

async fn load_existing_translations(path: &Path) -> Result<Option<serde_json::Value>> {
    if !translations_path(path).exists() {
        debug!("No previous translations at {}", path.display());
        return Ok(None);
    }
    load_translations(path).await.map(Some)
}

/// Locale keys of `current` that are absent from or different in `previous`
pub fn changed_locales(
    previous: Option<&serde_json::Value>,
    current: &serde_json::Value,
) -> Vec<String> {
    let Some(current) = current.as_object() else {
        return Vec::new();
    };

    current
        .iter()
        .filter(|(locale, value)| {
            previous.and_then(|prev| prev.get(locale.as_str())) != Some(*value)
        })
        .map(|(locale, _)| locale.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::{Reply, ScriptedTransport};
    use crate::core::client::{ApiClientConfig, Method};
    use crate::core::poller::LogProgress;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        transport: Arc<ScriptedTransport>,
        orchestrator: TranslationOrchestrator,
    }

    fn fixture(replies: Vec<Reply>, token: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let intro = dir.path().join("intro.md");
        let guide = dir.path().join("guide.md");
        std::fs::write(&intro, "# Intro\n").unwrap();
        std::fs::write(&guide, "# Guide\n").unwrap();

        let transport = ScriptedTransport::new(replies);
        let mut config = ApiClientConfig::new("https://api.test");
        if let Some(token) = token {
            config = config.with_token(token);
        }
        let service =
            TranslationService::new(ApiClient::with_transport(config, transport.clone()));

        let settings = JobSettings {
            project_id: "proj-1".to_string(),
            source_locale: LocaleCode::parse("en").unwrap(),
            target_locales: vec![
                LocaleCode::parse("fr").unwrap(),
                LocaleCode::parse("ja").unwrap(),
            ],
            source_files: vec![intro, guide],
            save_dir: dir.path().join("out/i18n"),
            load_path: None,
        };

        Fixture {
            orchestrator: TranslationOrchestrator::new(service, settings, PollerConfig::default()),
            transport,
            dir,
        }
    }

    fn progress(total: u64, completed: u64) -> serde_json::Value {
        json!({"translations_total": total, "translations_completed": completed})
    }

    fn translations(object: serde_json::Value) -> serde_json::Value {
        json!({ "translations_object": object })
    }

    #[tokio::test]
    async fn test_plan_body_from_two_files() {
        let fx = fixture(vec![Reply::Json(200, json!({"added_files": 2}))], Some("tok"));

        let report = fx.orchestrator.plan().await.unwrap();
        assert_eq!(report.diff.added, 2);
        assert_eq!(fx.transport.calls(), 1);

        let body = fx.transport.request(0).body.unwrap();
        let files = body["files_metadata"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_ne!(files[0]["fileHash"], files[1]["fileHash"]);
        assert_eq!(body["source_locale_iso"], json!("en"));
        assert_eq!(body["target_locale_isos"], json!(["fr", "ja"]));
        assert_eq!(body["project_uuid"], json!("proj-1"));
    }

    #[tokio::test]
    async fn test_plan_without_token_is_unauthorized() {
        let fx = fixture(vec![], None);

        let err = fx.orchestrator.plan().await.unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized));
        assert_eq!(fx.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_source_file_aborts_before_network() {
        let mut fx = fixture(vec![], Some("tok"));
        fx.orchestrator
            .settings
            .source_files
            .push(fx.dir.path().join("missing.md"));

        let err = fx.orchestrator.plan().await.unwrap_err();
        assert!(matches!(err, SyncError::File { .. }));
        assert_eq!(fx.transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_runs_full_sequence() {
        let fx = fixture(
            vec![
                Reply::Json(200, json!({"changed_files": ["intro.md"]})),
                Reply::Json(200, json!({"translation_job_id": "job-7"})),
                Reply::Json(200, progress(2, 1)),
                Reply::Json(200, progress(2, 2)),
                Reply::Json(200, translations(json!({"fr": {"intro": "Introduction"}}))),
            ],
            Some("tok"),
        );

        let mut updates = Vec::new();
        let mut sink = |completed: u64, total: u64| updates.push((completed, total));
        let report = fx.orchestrator.execute(&mut sink).await.unwrap();

        assert_eq!(report.job_id, "job-7");
        assert_eq!(report.diff.changed, 1);
        assert_eq!(report.progress.translations_completed, 2);
        assert_eq!(updates, vec![(1, 2), (2, 2)]);
        assert_eq!(fx.transport.calls(), 5);

        let create = fx.transport.request(1);
        assert_eq!(create.method, Method::Post);
        assert!(create.url.ends_with("/translation-jobs/create-with-parsed-files"));
        let body = create.body.unwrap();
        assert_eq!(body["parsed_files"].as_array().unwrap().len(), 2);
        assert!(Uuid::parse_str(body["translation_job_uuid"].as_str().unwrap()).is_ok());
        assert!(fx
            .transport
            .request(2)
            .url
            .ends_with("/translation-jobs/job-7/translation-progress"));

        let saved_to = &report.pull.saved_to;
        assert_eq!(saved_to, &fx.dir.path().join("out/i18n").join(TRANSLATIONS_FILE));
        assert_eq!(report.pull.changed_locales, vec!["fr".to_string()]);
        let saved = std::fs::read_to_string(saved_to).unwrap();
        assert!(saved.contains('\n'));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&saved).unwrap(),
            json!({"fr": {"intro": "Introduction"}})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_job_creation_reports_job_id() {
        let fx = fixture(
            vec![
                Reply::Json(200, json!({})),
                Reply::Json(200, json!({"translation_job_id": "job-8"})),
                Reply::Json(200, progress(4, 0)),
                Reply::Fail("connection reset".to_string()),
            ],
            Some("tok"),
        );

        let err = fx.orchestrator.execute(&mut LogProgress).await.unwrap_err();
        match err {
            SyncError::JobIncomplete { job_id, source } => {
                assert_eq!(job_id, "job-8");
                assert!(matches!(*source, SyncError::Network { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fx.transport.calls(), 4);
        assert!(!fx.dir.path().join("out/i18n").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_execute_is_incomplete() {
        let fx = fixture(
            vec![
                Reply::Json(200, json!({})),
                Reply::Json(200, json!({"translation_job_id": "job-9"})),
                Reply::Json(200, progress(4, 0)),
            ],
            Some("tok"),
        );
        let handle = fx.orchestrator.cancel_handle();
        let mut sink = |_: u64, _: u64| handle.cancel();

        let err = fx.orchestrator.execute(&mut sink).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::JobIncomplete { ref source, .. } if matches!(**source, SyncError::Cancelled)
        ));
        assert_eq!(fx.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_changed_source_after_plan_creates_no_job() {
        let fx = fixture(vec![Reply::Json(200, json!({}))], Some("tok"));

        let report = fx.orchestrator.plan().await.unwrap();
        std::fs::write(&fx.orchestrator.settings().source_files[0], "# Edited\n").unwrap();

        let err = fx
            .orchestrator
            .execute_plan(&report, &mut LogProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
        assert_eq!(fx.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_save_and_load_translations() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/i18n");
        let value = json!({"de": {"hello": "hallo"}});

        let path = save_translations(&target, &value).await.unwrap();
        assert_eq!(path, target.join(TRANSLATIONS_FILE));
        assert_eq!(load_translations(&target).await.unwrap(), value);
        assert_eq!(load_translations(&path).await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_cancelled_orchestrator_creates_no_job() {
        let fx = fixture(vec![Reply::Json(200, json!({}))], Some("tok"));
        fx.orchestrator.cancel_handle().cancel();

        let err = fx.orchestrator.execute(&mut LogProgress).await.unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
        assert_eq!(fx.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_between_plan_and_execute_creates_no_job() {
        let fx = fixture(vec![Reply::Json(200, json!({}))], Some("tok"));

        let report = fx.orchestrator.plan().await.unwrap();
        fx.orchestrator.cancel_handle().cancel();

        let err = fx
            .orchestrator
            .execute_plan(&report, &mut LogProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
        assert_eq!(fx.transport.calls(), 1);
        assert!(fx.transport.request(0).url.ends_with("/generate-plan-from-entire-files"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_pending_pull() {
        let fx = fixture(
            vec![
                Reply::Json(200, json!({})),
                Reply::Json(200, json!({"translation_job_id": "job-10"})),
                Reply::Json(200, progress(1, 1)),
                Reply::Hang,
            ],
            Some("tok"),
        );
        let handle = fx.orchestrator.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            handle.cancel();
        });

        let started = tokio::time::Instant::now();
        let err = fx.orchestrator.execute(&mut LogProgress).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::JobIncomplete { ref source, .. } if matches!(**source, SyncError::Cancelled)
        ));
        assert_eq!(fx.transport.calls(), 4);
        assert!(started.elapsed() < Duration::from_secs(30));
        assert!(!fx.dir.path().join("out/i18n").exists());
    }

    #[tokio::test]
    async fn test_pull_compares_with_loaded_translations() {
        let mut fx = fixture(
            vec![Reply::Json(
                200,
                translations(json!({
                    "de": {"intro": "Einleitung"},
                    "fr": {"intro": "Introduction"},
                    "ja": {"intro": "はじめに"},
                })),
            )],
            Some("tok"),
        );
        let save_dir = fx.orchestrator.settings.save_dir.clone();
        save_translations(
            &save_dir,
            &json!({
                "fr": {"intro": "Introduction"},
                "ja": {"intro": "紹介"},
            }),
        )
        .await
        .unwrap();
        fx.orchestrator.settings.load_path = Some(save_dir.clone());

        let report = fx.orchestrator.pull().await.unwrap();

        let mut changed = report.changed_locales.clone();
        changed.sort();
        assert_eq!(changed, vec!["de".to_string(), "ja".to_string()]);
        assert_eq!(report.saved_to, save_dir.join(TRANSLATIONS_FILE));
        assert_eq!(
            load_translations(&save_dir).await.unwrap()["ja"]["intro"],
            json!("はじめに")
        );
    }

    #[tokio::test]
    async fn test_pull_with_missing_load_path_treats_all_locales_as_changed() {
        let mut fx = fixture(
            vec![Reply::Json(200, translations(json!({"fr": {}, "ja": {}})))],
            Some("tok"),
        );
        fx.orchestrator.settings.load_path = Some(fx.dir.path().join("never-pulled"));

        let report = fx.orchestrator.pull().await.unwrap();
        assert_eq!(report.changed_locales.len(), 2);
    }

    #[test]
    fn test_changed_locales_ignores_non_object() {
        assert!(changed_locales(None, &json!("oops")).is_empty());
        assert_eq!(
            changed_locales(Some(&json!({"fr": 1})), &json!({"fr": 1, "de": 2})),
            vec!["de".to_string()]
        );
    }
}
