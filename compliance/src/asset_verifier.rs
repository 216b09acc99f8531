//! Canonical asset verification.
//!
//! The canonical asset document declares an official logo, a registry of
//! asset categories and the rules every asset must satisfy. Relative paths
//! in the document are resolved against the directory the document was
//! loaded from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AssetVerifierConfig;
use crate::types::Result;

const DEFAULT_MIN_SIZE: u64 = 1024;
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

fn default_min_size() -> u64 {
    DEFAULT_MIN_SIZE
}

fn default_max_size() -> u64 {
    DEFAULT_MAX_SIZE
}

fn default_formats() -> Vec<String> {
    vec!["png".to_string(), "svg".to_string()]
}

/// Rules applied to every verified asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRules {
    #[serde(default = "default_min_size")]
    pub min_logo_size: u64,
    #[serde(default = "default_max_size")]
    pub max_logo_size: u64,
    /// Lowercase extensions without the dot
    #[serde(default = "default_formats")]
    pub logo_formats: Vec<String>,
}

impl Default for VerificationRules {
    fn default() -> Self {
        Self {
            min_logo_size: DEFAULT_MIN_SIZE,
            max_logo_size: DEFAULT_MAX_SIZE,
            logo_formats: default_formats(),
        }
    }
}

/// Assets declared under one registry category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryAssets {
    /// The whole category is one asset
    Single(String),
    /// Named slots
    Named(BTreeMap<String, AssetSlot>),
}

/// A named slot inside a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetSlot {
    /// Required asset; failure is a hard failure
    Single(String),
    /// Auxiliary assets; failures are demoted to warnings
    List(Vec<String>),
}

/// The canonical asset document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonConfig {
    #[serde(rename = "OfficialLogo", default)]
    pub official_logo: Option<String>,
    #[serde(rename = "AssetRegistry", default)]
    pub asset_registry: BTreeMap<String, CategoryAssets>,
    #[serde(rename = "VerificationRules", default)]
    pub verification_rules: VerificationRules,
}

/// Kind of problem found with an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetIssueKind {
    Missing,
    NotAFile,
    Size,
    Format,
}

/// One problem found with an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIssue {
    pub kind: AssetIssueKind,
    pub message: String,
}

impl AssetIssue {
    fn new(kind: AssetIssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Options for a single verification.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Category or role of the asset (e.g. "logo")
    pub asset_type: Option<String>,
    /// Display name; defaults to the file name
    pub name: Option<String>,
}

impl VerifyOptions {
    pub fn typed(asset_type: impl Into<String>) -> Self {
        Self {
            asset_type: Some(asset_type.into()),
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Outcome of verifying one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetVerification {
    /// Path as declared
    pub path: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub name: String,
    /// True iff `errors` is empty
    pub valid: bool,
    pub errors: Vec<AssetIssue>,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl AssetVerification {
    /// Whether any issue of `kind` was recorded.
    pub fn has_issue(&self, kind: AssetIssueKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

/// Results partitioned by severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResults {
    pub verified: Vec<AssetVerification>,
    pub failed: Vec<AssetVerification>,
    pub warnings: Vec<AssetVerification>,
}

impl VerificationResults {
    fn merge(&mut self, other: VerificationResults) {
        self.verified.extend(other.verified);
        self.failed.extend(other.failed);
        self.warnings.extend(other.warnings);
    }

    fn record_required(&mut self, result: AssetVerification) {
        if result.valid {
            self.verified.push(result);
        } else {
            self.failed.push(result);
        }
    }

    fn record_auxiliary(&mut self, result: AssetVerification) {
        if result.valid {
            self.verified.push(result);
        } else {
            self.warnings.push(result);
        }
    }
}

/// Overall report status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Pass,
    Fail,
}

/// Counts for a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Verified plus failed; warnings are counted separately
    pub total: usize,
    pub verified: usize,
    pub failed: usize,
    pub warnings: usize,
}

/// Condensed view of one asset in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl From<&AssetVerification> for ReportEntry {
    fn from(v: &AssetVerification) -> Self {
        Self {
            path: v.path.clone(),
            asset_type: v.asset_type.clone(),
            size: v.size,
            errors: v.errors.iter().map(|e| e.message.clone()).collect(),
        }
    }
}

/// Verification report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: DateTime<Utc>,
    pub summary: ReportSummary,
    pub verified: Vec<ReportEntry>,
    pub failed: Vec<ReportEntry>,
    pub warnings: Vec<ReportEntry>,
    pub status: ReportStatus,
}

/// Verifies canonical assets against the configured rules.
pub struct AssetVerifier {
    canon: CanonConfig,
    /// Directory relative asset paths are resolved against
    base_dir: Option<PathBuf>,
}

impl AssetVerifier {
    /// Create from an already-loaded document. Relative paths resolve
    /// against the working directory.
    pub fn new(canon: CanonConfig) -> Self {
        Self {
            canon,
            base_dir: None,
        }
    }

    /// Load the canonical asset document from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let canon: CanonConfig = serde_json::from_str(&raw)?;

        info!(
            path = %path.display(),
            categories = canon.asset_registry.len(),
            "Loaded canon configuration"
        );

        Ok(Self {
            canon,
            base_dir: path.parent().map(Path::to_path_buf),
        })
    }

    /// Load from the location named in the compliance configuration.
    pub async fn from_config(config: &AssetVerifierConfig) -> Result<Self> {
        Self::from_file(&config.canon_config_path).await
    }

    /// The loaded document.
    pub fn canon(&self) -> &CanonConfig {
        &self.canon
    }

    fn rules(&self) -> &VerificationRules {
        &self.canon.verification_rules
    }

    fn resolve(&self, declared: &str) -> PathBuf {
        let path = Path::new(declared);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Verify a single asset. Every applicable check runs and all failures
    /// accumulate; the size check is skipped only when there is no file to
    /// measure.
    pub async fn verify_asset(&self, declared: &str, options: VerifyOptions) -> AssetVerification {
        let path = self.resolve(declared);
        let mut errors = Vec::new();
        let mut size = None;
        let mut modified = None;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                size = Some(meta.len());
                modified = meta.modified().ok().map(DateTime::<Utc>::from);
                if let Some(issue) = self.check_size(meta.len()) {
                    errors.push(issue);
                }
            }
            Ok(_) => errors.push(AssetIssue::new(AssetIssueKind::NotAFile, "Path is not a file")),
            Err(e) => errors.push(AssetIssue::new(
                AssetIssueKind::Missing,
                format!("File not found: {}", e),
            )),
        }

        if let Some(issue) = self.check_format(&path) {
            errors.push(issue);
        }

        let name = options.name.unwrap_or_else(|| {
            Path::new(declared)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| declared.to_string())
        });

        let result = AssetVerification {
            path: declared.to_string(),
            asset_type: options.asset_type.unwrap_or_else(|| "unknown".to_string()),
            name,
            valid: errors.is_empty(),
            errors,
            size,
            modified,
        };

        debug!(path = %declared, valid = result.valid, issues = result.errors.len(), "Verified asset");

        result
    }

    fn check_size(&self, size: u64) -> Option<AssetIssue> {
        let rules = self.rules();
        if size < rules.min_logo_size {
            return Some(AssetIssue::new(
                AssetIssueKind::Size,
                format!("File size {} bytes is below minimum {} bytes", size, rules.min_logo_size),
            ));
        }
        if size > rules.max_logo_size {
            return Some(AssetIssue::new(
                AssetIssueKind::Size,
                format!("File size {} bytes exceeds maximum {} bytes", size, rules.max_logo_size),
            ));
        }
        None
    }

    fn check_format(&self, path: &Path) -> Option<AssetIssue> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let allowed = &self.rules().logo_formats;

        if allowed.iter().any(|f| f.eq_ignore_ascii_case(&ext)) {
            None
        } else {
            Some(AssetIssue::new(
                AssetIssueKind::Format,
                format!("Format '{}' not in allowed formats: {}", ext, allowed.join(", ")),
            ))
        }
    }

    /// Verify one registry category.
    pub async fn verify_category(&self, category: &str, assets: &CategoryAssets) -> VerificationResults {
        let mut results = VerificationResults::default();

        match assets {
            CategoryAssets::Single(path) => {
                let r = self.verify_asset(path, VerifyOptions::typed(category)).await;
                results.record_required(r);
            }
            CategoryAssets::Named(slots) => {
                for (name, slot) in slots {
                    match slot {
                        AssetSlot::Single(path) => {
                            let r = self
                                .verify_asset(path, VerifyOptions::typed(category).named(name))
                                .await;
                            results.record_required(r);
                        }
                        AssetSlot::List(paths) => {
                            for path in paths {
                                let r = self
                                    .verify_asset(path, VerifyOptions::typed(category).named(name))
                                    .await;
                                results.record_auxiliary(r);
                            }
                        }
                    }
                }
            }
        }

        results
    }

    /// Verify the official logo and every registry category.
    pub async fn verify_all(&self) -> VerificationResults {
        let mut results = VerificationResults::default();

        if let Some(logo) = &self.canon.official_logo {
            let r = self.verify_asset(logo, VerifyOptions::typed("logo")).await;
            results.record_required(r);
        }

        for (category, assets) in &self.canon.asset_registry {
            let category_results = self.verify_category(category, assets).await;
            results.merge(category_results);
        }

        if results.failed.is_empty() {
            info!(
                verified = results.verified.len(),
                warnings = results.warnings.len(),
                "Canonical assets verified"
            );
        } else {
            warn!(
                failed = results.failed.len(),
                warnings = results.warnings.len(),
                "Canonical asset verification failed"
            );
        }

        results
    }

    /// Summarize results into a report.
    pub fn generate_report(&self, results: &VerificationResults) -> VerificationReport {
        VerificationReport {
            timestamp: Utc::now(),
            summary: ReportSummary {
                total: results.verified.len() + results.failed.len(),
                verified: results.verified.len(),
                failed: results.failed.len(),
                warnings: results.warnings.len(),
            },
            verified: results.verified.iter().map(ReportEntry::from).collect(),
            failed: results.failed.iter().map(ReportEntry::from).collect(),
            warnings: results.warnings.iter().map(ReportEntry::from).collect(),
            status: if results.failed.is_empty() {
                ReportStatus::Pass
            } else {
                ReportStatus::Fail
            },
        }
    }
}
