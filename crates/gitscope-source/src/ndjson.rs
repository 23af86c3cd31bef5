//! Source adapter reading a newline-delimited JSON export
//!
//! One record per line. Files are read lazily, so exports larger than memory
//! stream fine. Lines that fail to parse are logged and skipped; an I/O error
//! ends the stream with `SourceError::Unavailable`.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use gitscope_model::{GroupFilter, GroupRecord, ProjectFilter, ProjectRecord, RawRecord};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::error::{SourceError, SourceResult};
use crate::traits::ProjectSource;

#[derive(Debug, Clone)]
pub struct NdjsonSource {
    projects_path: PathBuf,
    groups_path: PathBuf,
}

impl NdjsonSource {
    pub fn new(projects_path: impl Into<PathBuf>, groups_path: impl Into<PathBuf>) -> Self {
        Self {
            projects_path: projects_path.into(),
            groups_path: groups_path.into(),
        }
    }

    pub fn projects_path(&self) -> &Path {
        &self.projects_path
    }

    pub fn groups_path(&self) -> &Path {
        &self.groups_path
    }
}

enum Reader {
    Closed(PathBuf),
    Open {
        lines: Lines<BufReader<File>>,
        line_no: usize,
    },
    Done,
}

async fn next_record<T>(mut reader: Reader) -> Option<(SourceResult<T>, Reader)>
where
    T: RawRecord + DeserializeOwned,
{
    loop {
        reader = match reader {
            Reader::Closed(path) => match File::open(&path).await {
                Ok(file) => Reader::Open {
                    lines: BufReader::new(file).lines(),
                    line_no: 0,
                },
                Err(e) => {
                    let message = format!("cannot open {}", path.display());
                    return Some((Err(SourceError::unavailable_with(message, e)), Reader::Done));
                }
            },
            Reader::Open { mut lines, line_no } => match lines.next_line().await {
                Ok(Some(line)) => {
                    let line_no = line_no.saturating_add(1);
                    if line.trim().is_empty() {
                        Reader::Open { lines, line_no }
                    } else {
                        match serde_json::from_str::<T>(&line) {
                            Ok(record) => return Some((Ok(record), Reader::Open { lines, line_no })),
                            Err(e) => {
                                tracing::warn!(
                                    kind = %T::KIND,
                                    line = line_no,
                                    error = %e,
                                    "Skipping malformed export line"
                                );
                                Reader::Open { lines, line_no }
                            }
                        }
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    let message = format!("read failed after line {line_no}");
                    return Some((Err(SourceError::unavailable_with(message, e)), Reader::Done));
                }
            },
            Reader::Done => return None,
        };
    }
}

fn read_records<T>(path: &Path) -> BoxStream<'static, SourceResult<T>>
where
    T: RawRecord + DeserializeOwned,
{
    stream::unfold(Reader::Closed(path.to_path_buf()), next_record::<T>).boxed()
}

async fn find_by_id<T>(path: &Path, id: i64) -> SourceResult<T>
where
    T: RawRecord + DeserializeOwned,
{
    let mut records = read_records::<T>(path);
    while let Some(record) = records.next().await {
        let record = record?;
        if record.id() == id {
            return Ok(record);
        }
    }
    Err(SourceError::NotFound { kind: T::KIND, id })
}

#[async_trait]
impl ProjectSource for NdjsonSource {
    fn stream_projects(
        &self,
        filter: &ProjectFilter,
    ) -> BoxStream<'static, SourceResult<ProjectRecord>> {
        let filter = filter.clone();
        read_records::<ProjectRecord>(&self.projects_path)
            .filter(move |record| {
                let keep = record
                    .as_ref()
                    .map_or(true, |p| filter.matches(p.visibility, p.archived));
                async move { keep }
            })
            .boxed()
    }

    fn stream_groups(&self, filter: &GroupFilter) -> BoxStream<'static, SourceResult<GroupRecord>> {
        let filter = filter.clone();
        read_records::<GroupRecord>(&self.groups_path)
            .filter(move |record| {
                let keep = record.as_ref().map_or(true, |g| filter.matches(g.visibility));
                async move { keep }
            })
            .boxed()
    }

    async fn fetch_project_by_id(&self, id: i64) -> SourceResult<ProjectRecord> {
        find_by_id(&self.projects_path, id).await
    }

    async fn fetch_group_by_id(&self, id: i64) -> SourceResult<GroupRecord> {
        find_by_id(&self.groups_path, id).await
    }
}
