//! Release submission: upload each migration as a sheet, then bundle the
//! sheets into a release tied to the source revision.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rollout_core::event::Revision;
use rollout_core::migration::MigrationFile;

use crate::client::Client;
use crate::types::{
    BatchCreateSheetsRequest, BatchCreateSheetsResponse, CreateReleaseRequest,
    CreateSheetRequest, Release, ReleaseFile, ReleaseFileType, SheetContent, VcsSource,
};
use crate::{ClientError, Result};

pub const VCS_TYPE: &str = "GITHUB";

/// Upload every file's content as a sheet in one batch call.
///
/// Returns one sheet name per file, in the same order as `files`.
pub async fn batch_create_sheets(client: &Client, files: &[MigrationFile]) -> Result<Vec<String>> {
    let body = BatchCreateSheetsRequest {
        requests: files
            .iter()
            .map(|f| CreateSheetRequest {
                sheet: SheetContent {
                    title: format!("sheet for file {}", f.name),
                    content: STANDARD.encode(f.content.as_bytes()),
                },
            })
            .collect(),
    };

    let path = format!("{}/sheets:batchCreate", client.project());
    let resp: BatchCreateSheetsResponse = client.post("batch create sheets", &path, &body).await?;
    let sheets: Vec<String> = resp.sheets.into_iter().map(|s| s.name).collect();

    if sheets.len() != files.len() {
        return Err(ClientError::SheetCountMismatch {
            expected: files.len(),
            got: sheets.len(),
        });
    }
    tracing::info!(count = sheets.len(), "created sheets");
    Ok(sheets)
}

/// Pair each file with the sheet at the same position.
pub fn release_files(files: &[MigrationFile], sheets: &[String]) -> Result<Vec<ReleaseFile>> {
    if files.len() != sheets.len() {
        return Err(ClientError::SheetCountMismatch {
            expected: files.len(),
            got: sheets.len(),
        });
    }
    Ok(files
        .iter()
        .zip(sheets)
        .map(|(f, sheet)| ReleaseFile {
            path: f.name.clone(),
            version: f.version.clone(),
            sheet: sheet.clone(),
            file_type: ReleaseFileType::Versioned,
        })
        .collect())
}

/// Create sheets for `files` and a release referencing them. Returns the
/// release name.
///
/// Not idempotent: every call creates new sheets and a new release.
pub async fn create_release(
    client: &Client,
    files: &[MigrationFile],
    revision: &Revision,
) -> Result<String> {
    let sheets = batch_create_sheets(client, files).await?;

    let body = CreateReleaseRequest {
        title: format!("release for commit {}", revision.commit),
        files: release_files(files, &sheets)?,
        vcs_source: VcsSource {
            vcs_type: VCS_TYPE.to_string(),
            url: revision.url.clone().unwrap_or_default(),
        },
    };

    let path = format!("{}/releases", client.project());
    let release: Release = client.post("create release", &path, &body).await?;
    tracing::info!(release = %release.name, commit = %revision.commit, "created release");
    Ok(release.name)
}

// ─── Tests ────────────────────────────────────────────────────────────────
