//! Builders for job-plan and job-creation request bodies

use chrono::{DateTime, SecondsFormat, Utc};

use crate::core::models::{
    CreateJobRequest, FileMetadata, JobPlanRequest, LocaleCode, ParsedFile,
};

/// Build the body for `generate-plan-from-entire-files`.
///
/// Targets keep their order; duplicates and the source locale are dropped.
pub fn build_job_plan(
    project_id: &str,
    source_locale: &LocaleCode,
    target_locales: &[LocaleCode],
    files_metadata: Vec<FileMetadata>,
) -> JobPlanRequest {
    JobPlanRequest {
        project_uuid: project_id.to_string(),
        source_locale_iso: source_locale.clone(),
        target_locale_isos: distinct_targets(source_locale, target_locales),
        files_metadata,
    }
}

/// Build the body for `create-with-parsed-files` from an already built plan
pub fn build_create_job_request(
    plan: &JobPlanRequest,
    job_uuid: impl Into<String>,
    parsed_files: Vec<ParsedFile>,
    name: impl Into<String>,
) -> CreateJobRequest {
    CreateJobRequest {
        project_uuid: plan.project_uuid.clone(),
        source_locale_iso: plan.source_locale_iso.clone(),
        target_locale_isos: plan.target_locale_isos.clone(),
        translation_job_uuid: job_uuid.into(),
        parsed_files,
        name: name.into(),
    }
}

/// Human-readable job name stamped with the submission time
pub fn default_job_name(now: DateTime<Utc>) -> String {
    format!(
        "{} {}",
        env!("CARGO_PKG_NAME"),
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Targets in order, without the source locale or repeats of an earlier target.
///
/// Codes are compared with [`LocaleCode::same_locale`], so `EN` matches `en`
/// and `pt_BR` matches `pt-BR`; the first spelling seen is kept.
pub fn distinct_targets(source: &LocaleCode, targets: &[LocaleCode]) -> Vec<LocaleCode> {
    let mut out: Vec<LocaleCode> = Vec::with_capacity(targets.len());
    for locale in targets {
        if !locale.same_locale(source) && !out.iter().any(|seen| seen.same_locale(locale)) {
            out.push(locale.clone());
        }
    }
    out
}
