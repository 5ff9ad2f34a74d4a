//! SynologyStore - RemoteStore implementation for Synology File Station
//!
//! The remote root is an absolute NAS path such as `/home/uploads`, checked
//! once by [`SynologyStore::connect`]. Every call runs inside its own
//! [`Session`]: `list_tree` logs in, walks and logs
//! out; an upload stream logs in on its first poll and out after its last
//! item or its first failure.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::vec;

use futures_util::stream;
use tracing::{debug, info, warn};

use upsync_core::domain::newtypes::{PathSet, RelativePath, RemotePath};
use upsync_core::domain::remote::RemoteRoot;
use upsync_core::ports::{RemoteStore, StoreError, UploadResult, UploadStream, UploadTask};

use crate::client::SynologyClient;
use crate::credentials::NasCredentials;
use crate::session::Session;
use crate::SynologyError;

/// File Station code for "no such file or directory"
const ROOT_MISSING: i64 = 408;

/// Remote store backed by a folder on a Synology NAS
pub struct SynologyStore {
    client: SynologyClient,
    credentials: NasCredentials,
    root: RemoteRoot,
}

/// Progress of an upload stream
enum UploadState {
    /// Not logged in yet
    Pending(vec::IntoIter<UploadTask>),
    /// Logged in, uploading the remaining tasks
    Open(Session, vec::IntoIter<UploadTask>),
    /// Finished or failed
    Done,
}

fn session_error(err: &anyhow::Error) -> StoreError {
    StoreError::Session(format!("{err:#}"))
}

/// The Web API error code carried somewhere in `err`, if any
fn api_code(err: &anyhow::Error) -> Option<i64> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SynologyError>())
        .and_then(|e| match e {
            SynologyError::Api { code, .. } => Some(*code),
            _ => None,
        })
}

/// Classifies a failed login: an answer from the NAS is a credentials
/// problem, anything else means the NAS could not be reached
fn login_error(err: &anyhow::Error) -> StoreError {
    match api_code(err) {
        Some(_) => session_error(err),
        None => StoreError::unavailable(err),
    }
}

impl SynologyStore {
    /// Creates a store around an existing client
    pub fn with_client(client: SynologyClient, credentials: NasCredentials, root: RemotePath) -> Self {
        Self {
            client,
            credentials,
            root: RemoteRoot::Path(root),
        }
    }

    /// Creates a store for `root` and checks it against the NAS
    ///
    /// Logs in, lists the first page of `root` and logs out again.
    ///
    /// # Errors
    /// - [`StoreError::BackendUnavailable`] if the NAS cannot be reached
    /// - [`StoreError::Session`] if the NAS rejects the login
    /// - [`StoreError::RootNotFound`] if `root` does not exist
    /// - [`StoreError::InvalidRoot`] if `root` cannot be listed
    pub async fn connect(
        client: SynologyClient,
        credentials: NasCredentials,
        root: RemotePath,
    ) -> Result<Self, StoreError> {
        let session = Session::open(&client, &credentials)
            .await
            .map_err(|e| login_error(&e))?;

        let listed = client.list_page(session.sid(), root.as_str(), 0).await;
        session.close_quietly().await;

        match listed {
            Ok(page) => {
                info!(host = %credentials.host, root = %root, entries = page.total, "Checked NAS root folder");
                Ok(Self::with_client(client, credentials, root))
            }
            Err(err) => Err(match api_code(&err) {
                Some(ROOT_MISSING) => StoreError::RootNotFound(root.to_string()),
                Some(_) => StoreError::InvalidRoot(format!("{root}: {err:#}")),
                None => StoreError::unavailable(&err),
            }),
        }
    }

    /// Loads the NAS key file and connects a store rooted at `folder`
    pub async fn from_key_file(key_path: &Path, folder: &str) -> Result<Self, StoreError> {
        let root = RemotePath::new(folder).map_err(|e| StoreError::InvalidRoot(e.to_string()))?;
        let credentials = NasCredentials::load(key_path).map_err(|e| session_error(&e))?;
        let client = credentials
            .base_url()
            .and_then(|url| SynologyClient::new(&url))
            .map_err(|e| session_error(&e))?;
        Self::connect(client, credentials, root).await
    }

    /// Recursively collects the entries below `folder`
    ///
    /// A directory without children contributes its own path.
    fn walk<'a>(
        &'a self,
        session: &'a Session,
        root: &'a RemotePath,
        folder: String,
        prefix: Option<RelativePath>,
        out: &'a mut PathSet,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let entries = self.client.list_folder(session.sid(), &folder).await?;

            if entries.is_empty() {
                if let Some(prefix) = prefix {
                    out.insert(prefix);
                }
                return Ok(());
            }

            for entry in entries {
                let relative = root.relative(&entry.path).or_else(|| {
                    let joined = match &prefix {
                        Some(p) => format!("{}/{}", p, entry.name),
                        None => entry.name.clone(),
                    };
                    RelativePath::new(joined).ok()
                });
                let Some(relative) = relative else {
                    warn!(path = %entry.path, "Skipping remote entry");
                    continue;
                };

                if entry.isdir {
                    self.walk(session, root, entry.path, Some(relative), out)
                        .await?;
                } else {
                    out.insert(relative);
                }
            }

            Ok(())
        })
    }

    async fn upload_one(&self, session: &Session, task: &UploadTask) -> anyhow::Result<()> {
        let RemoteRoot::Path(folder) = &task.destination.folder else {
            anyhow::bail!(
                "NAS uploads need a folder path, got {}",
                task.destination.folder
            );
        };

        self.client
            .upload(
                session.sid(),
                folder.as_str(),
                &task.destination.file_name,
                &task.source,
            )
            .await
    }
}

#[async_trait::async_trait]
impl RemoteStore for SynologyStore {
    fn name(&self) -> &str {
        "synology"
    }

    fn root(&self) -> &RemoteRoot {
        &self.root
    }

    async fn list_tree(&self, root: &RemoteRoot) -> Result<PathSet, StoreError> {
        let RemoteRoot::Path(root) = root else {
            return Err(StoreError::InvalidRoot(format!(
                "NAS roots are absolute paths, got {root}"
            )));
        };

        let session = Session::open(&self.client, &self.credentials)
            .await
            .map_err(|e| session_error(&e))?;

        let mut files = PathSet::new();
        let walked = self
            .walk(&session, root, root.as_str().to_string(), None, &mut files)
            .await;
        session.close_quietly().await;

        walked.map_err(|e| StoreError::unavailable(&e))?;

        debug!(count = files.len(), root = %root, "NAS tree listed");
        Ok(files)
    }

    fn upload(&self, batch: Vec<UploadTask>) -> UploadStream<'_> {
        Box::pin(stream::unfold(
            UploadState::Pending(batch.into_iter()),
            move |mut state| async move {
                loop {
                    state = match state {
                        UploadState::Pending(tasks) => {
                            if tasks.as_slice().is_empty() {
                                return None;
                            }
                            match Session::open(&self.client, &self.credentials).await {
                                Ok(session) => UploadState::Open(session, tasks),
                                Err(err) => {
                                    return Some((Err(session_error(&err)), UploadState::Done))
                                }
                            }
                        }
                        UploadState::Open(session, mut tasks) => {
                            let Some(task) = tasks.next() else {
                                session.close_quietly().await;
                                return None;
                            };

                            match self.upload_one(&session, &task).await {
                                Ok(()) => {
                                    let name = task.destination.file_name.clone();
                                    return Some((
                                        Ok(UploadResult::completed(task, name)),
                                        UploadState::Open(session, tasks),
                                    ));
                                }
                                Err(err) => {
                                    session.close_quietly().await;
                                    return Some((
                                        Err(StoreError::upload_failed(&task.source, &err)),
                                        UploadState::Done,
                                    ));
                                }
                            }
                        }
                        UploadState::Done => return None,
                    };
                }
            },
        ))
    }
}
