use futures::FutureExt;
use futures::StreamExt;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("video {0:?} not found")]
    NotFound(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("bucket: {0}")]
    Bucket(#[from] s3::error::S3Error),
}

/// The bytes of a stored video.
#[derive(Debug, Clone)]
pub enum VideoData {
    MemMapped(std::sync::Arc<memmap2::Mmap>),
    Preloaded(std::sync::Arc<[u8]>),
}

impl VideoData {
    pub fn data(&self) -> &[u8] {
        match self {
            VideoData::MemMapped(v) => v,
            VideoData::Preloaded(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// Replaces everything but ASCII letters, digits, `.`, `-` and `_`, so a
/// client supplied name can never leave its folder.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        return "video".to_owned();
    }
    cleaned
}

/// `<owner>/<game>/<file>`, the location of an uploaded video.
pub fn video_key(owner: &str, game_id: uuid::Uuid, file_name: &str) -> String {
    format!(
        "{}/{}/{}",
        sanitize_file_name(owner),
        game_id,
        sanitize_file_name(file_name)
    )
}

fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key.split('/').all(|part| !part.is_empty() && part != "..");

    if !valid {
        return Err(StorageError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

pub trait VideoStorage: Send + Sync {
    fn upload<'f, 's, 'own>(
        &'own self,
        key: String,
        stream: futures_util::stream::BoxStream<'s, Result<axum::body::Bytes, std::io::Error>>,
    ) -> futures::future::BoxFuture<'f, Result<u64, StorageError>>
    where
        's: 'f,
        'own: 'f;

    fn load<'f, 'own>(
        &'own self,
        key: String,
    ) -> futures::future::BoxFuture<'f, Result<VideoData, StorageError>>
    where
        'own: 'f;
}

pub struct FileStorage {
    folder: std::path::PathBuf,
}

impl FileStorage {
    pub fn new<P>(folder: P) -> Self
    where
        P: Into<std::path::PathBuf>,
    {
        Self {
            folder: folder.into(),
        }
    }
}

impl VideoStorage for FileStorage {
    fn upload<'f, 's, 'own>(
        &'own self,
        key: String,
        stream: futures_util::stream::BoxStream<'s, Result<axum::body::Bytes, std::io::Error>>,
    ) -> futures::future::BoxFuture<'f, Result<u64, StorageError>>
    where
        's: 'f,
        'own: 'f,
    {
        async move {
            check_key(&key)?;
            let video_path = self.folder.join(&key);

            if let Some(parent) = video_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let body_reader = tokio_util::io::StreamReader::new(stream);
            futures::pin_mut!(body_reader);

            let mut file = tokio::io::BufWriter::new(tokio::fs::File::create(&video_path).await?);
            let written = tokio::io::copy(&mut body_reader, &mut file).await?;
            tokio::io::AsyncWriteExt::flush(&mut file).await?;

            tracing::debug!(?video_path, written, "Stored video");
            Ok(written)
        }
        .boxed()
    }

    fn load<'f, 'own>(
        &'own self,
        key: String,
    ) -> futures::future::BoxFuture<'f, Result<VideoData, StorageError>>
    where
        'own: 'f,
    {
        async move {
            check_key(&key)?;
            let video_path = self.folder.join(&key);

            let file = match std::fs::File::open(&video_path) {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(StorageError::NotFound(key));
                }
                Err(e) => return Err(e.into()),
            };

            // Empty files cannot be mapped.
            if file.metadata()?.len() == 0 {
                return Ok(VideoData::Preloaded(std::sync::Arc::from(Vec::new())));
            }

            // SAFETY: uploaded videos are written once and never modified afterwards.
            let mmap = unsafe { memmap2::MmapOptions::new().map(&file)? };

            Ok(VideoData::MemMapped(std::sync::Arc::new(mmap)))
        }
        .boxed()
    }
}

/// `get_object` reports every non-success status as an error.
fn missing_object(key: String, err: s3::error::S3Error) -> StorageError {
    match err {
        s3::error::S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key),
        other => StorageError::Bucket(other),
    }
}

pub struct S3Storage {
    bucket: std::sync::Arc<s3::Bucket>,
}

impl S3Storage {
    pub fn new(
        bucket_name: &str,
        region: s3::region::Region,
        credentials: s3::creds::Credentials,
    ) -> Result<Self, StorageError> {
        let mut bucket = s3::bucket::Bucket::new(bucket_name, region, credentials)?;
        bucket.set_path_style();

        Ok(Self {
            bucket: bucket.into(),
        })
    }
}

impl VideoStorage for S3Storage {
    fn upload<'f, 's, 'own>(
        &'own self,
        key: String,
        stream: futures_util::stream::BoxStream<'s, Result<axum::body::Bytes, std::io::Error>>,
    ) -> futures::future::BoxFuture<'f, Result<u64, StorageError>>
    where
        's: 'f,
        'own: 'f,
    {
        async move {
            check_key(&key)?;

            let mut written = 0u64;
            {
                let counted = stream.inspect(|chunk| {
                    if let Ok(chunk) = chunk {
                        written += chunk.len() as u64;
                    }
                });
                let body_reader = tokio_util::io::StreamReader::new(counted);
                futures::pin_mut!(body_reader);

                self.bucket.put_object_stream(&mut body_reader, &key).await?;
            }

            tracing::debug!(key, written, "Stored video in bucket");
            Ok(written)
        }
        .boxed()
    }

    fn load<'f, 'own>(
        &'own self,
        key: String,
    ) -> futures::future::BoxFuture<'f, Result<VideoData, StorageError>>
    where
        'own: 'f,
    {
        async move {
            check_key(&key)?;

            let resp = match self.bucket.get_object(&key).await {
                Ok(resp) => resp,
                Err(e) => return Err(missing_object(key, e)),
            };

            Ok(VideoData::Preloaded(resp.to_vec().into()))
        }
        .boxed()
    }
}
