// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of project-runs under a base directory.
//!
//! Each immediate subdirectory of the base directory is one project-run. Within it, the first
//! metadata file and the first report file found (files before subdirectories, each in name
//! order) are used.

use crate::{
    config::DiscoveryConfig,
    errors::{DiscoveryError, DiscoveryErrorKind},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::cmp::Ordering;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// The artifacts found for one project-run.
///
/// Either artifact may be missing; extraction reports that as an error for this project only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectInputs {
    /// The project-run directory.
    pub project_dir: Utf8PathBuf,

    /// The metadata artifact, if found.
    pub metadata: Option<Utf8PathBuf>,

    /// The report artifact, if found.
    pub report: Option<Utf8PathBuf>,
}

/// Finds project-runs under `base_dir`, in directory name order.
pub fn discover_projects(
    base_dir: &Utf8Path,
    config: &DiscoveryConfig,
) -> Result<Vec<ProjectInputs>, DiscoveryError> {
    if !base_dir.is_dir() {
        return Err(DiscoveryError::new(
            base_dir,
            DiscoveryErrorKind::NotADirectory,
        ));
    }

    let mut projects = Vec::new();
    let walker = WalkDir::new(base_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|err| DiscoveryError::new(base_dir, err.into()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let project_dir = Utf8PathBuf::try_from(entry.into_path())
            .map_err(|err| DiscoveryError::new(base_dir, err.into()))?;

        debug!("searching `{project_dir}` for artifacts");
        projects.push(find_artifacts(project_dir, config));
    }

    Ok(projects)
}

fn find_artifacts(project_dir: Utf8PathBuf, config: &DiscoveryConfig) -> ProjectInputs {
    let mut metadata = None;
    let mut report = None;

    let walker = WalkDir::new(&project_dir)
        .min_depth(1)
        .follow_links(true)
        .sort_by(files_first);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry under `{project_dir}`: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::try_from(entry.into_path()) else {
            continue;
        };

        match path.extension() {
            Some(ext) if metadata.is_none() && ext == config.metadata_extension => {
                debug!("found metadata file `{path}`");
                metadata = Some(path);
            }
            Some(ext) if report.is_none() && ext == config.report_extension => {
                debug!("found report file `{path}`");
                report = Some(path);
            }
            _ => {}
        }

        if metadata.is_some() && report.is_some() {
            break;
        }
    }

    ProjectInputs {
        project_dir,
        metadata,
        report,
    }
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;

    fn touch(path: &Utf8Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn discovers_in_name_order() {
        let dir = Utf8TempDir::new().unwrap();
        let base = dir.path();
        touch(&base.join("b-linux/nested/deeper/report.json"));
        touch(&base.join("b-linux/meta.csv"));
        touch(&base.join("a-mac/z.csv"));
        touch(&base.join("a-mac/a.csv"));
        touch(&base.join("a-mac/sub/report.json"));
        touch(&base.join("a-mac/sub/other.csv"));
        touch(&base.join("c-windows/readme.txt"));
        // Files directly under the base directory are not project-runs.
        touch(&base.join("final_all.csv"));

        let projects = discover_projects(base, &DiscoveryConfig::default()).unwrap();
        assert_eq!(
            projects,
            vec![
                ProjectInputs {
                    project_dir: base.join("a-mac"),
                    metadata: Some(base.join("a-mac/a.csv")),
                    report: Some(base.join("a-mac/sub/report.json")),
                },
                ProjectInputs {
                    project_dir: base.join("b-linux"),
                    metadata: Some(base.join("b-linux/meta.csv")),
                    report: Some(base.join("b-linux/nested/deeper/report.json")),
                },
                ProjectInputs {
                    project_dir: base.join("c-windows"),
                    metadata: None,
                    report: None,
                },
            ]
        );
    }

    #[test]
    fn custom_extensions() {
        let dir = Utf8TempDir::new().unwrap();
        let base = dir.path();
        touch(&base.join("p1/meta.tsv"));
        touch(&base.join("p1/meta.csv"));
        touch(&base.join("p1/report.jsonl"));

        let config = DiscoveryConfig {
            metadata_extension: "tsv".to_owned(),
            report_extension: "jsonl".to_owned(),
        };
        let projects = discover_projects(base, &config).unwrap();
        assert_eq!(projects[0].metadata, Some(base.join("p1/meta.tsv")));
        assert_eq!(projects[0].report, Some(base.join("p1/report.jsonl")));
    }

    #[test]
    fn base_dir_must_exist() {
        let dir = Utf8TempDir::new().unwrap();
        let err = discover_projects(&dir.path().join("missing"), &DiscoveryConfig::default())
            .unwrap_err();
        assert_eq!(err.base_dir(), dir.path().join("missing"));
    }
}
