//! The `sftp` subsystem (spec.md §4.1's `subsystem` dispatch row). Serves
//! the real filesystem directly — this agent has exactly one client and
//! that client is fully trusted once authenticated, so there is no
//! virtual-filesystem indirection to speak of.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use russh_sftp::protocol::{
    Attrs, Data, File, FileAttributes, Handle, Name, OpenFlags, Status, StatusCode, Version,
};
use std::io::SeekFrom;

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

enum OpenHandle {
    File(tokio::fs::File),
    Dir { entries: Vec<String>, pos: usize },
}

/// One `russh_sftp` server session. A fresh instance is created per
/// `subsystem` request and dropped when the channel closes.
#[derive(Default)]
pub struct ScmpdSftpHandler {
    next_handle: u64,
    handles: HashMap<String, OpenHandle>,
}

impl ScmpdSftpHandler {
    fn alloc_handle(&mut self, h: OpenHandle) -> String {
        self.next_handle += 1;
        let id = self.next_handle.to_string();
        self.handles.insert(id.clone(), h);
        id
    }

    fn metadata_to_attrs(meta: &std::fs::Metadata) -> FileAttributes {
        let mut attrs = FileAttributes::default();
        attrs.size = Some(meta.len());
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            attrs.uid = Some(meta.uid());
            attrs.gid = Some(meta.gid());
            attrs.permissions = Some(meta.mode());
            attrs.mtime = Some(meta.mtime() as u32);
            attrs.atime = Some(meta.atime() as u32);
        }
        attrs
    }
}

fn status(id: u32, code: StatusCode, message: &str) -> Status {
    Status {
        id,
        status_code: code,
        error_message: message.to_string(),
        language_tag: "en".to_string(),
    }
}

fn io_error_code(err: &std::io::Error) -> StatusCode {
    match err.kind() {
        std::io::ErrorKind::NotFound => StatusCode::NoSuchFile,
        std::io::ErrorKind::PermissionDenied => StatusCode::PermissionDenied,
        _ => StatusCode::Failure,
    }
}

type SftpResult<T> = Result<T, StatusCode>;

#[async_trait::async_trait]
impl russh_sftp::server::Handler for ScmpdSftpHandler {
    type Error = StatusCode;

    fn unimplemented(&self) -> Self::Error {
        StatusCode::OpUnsupported
    }

    async fn init(
        &mut self,
        version: u32,
        _extensions: HashMap<String, String>,
    ) -> Result<Version, Self::Error> {
        debug!(version, "sftp session initialized");
        Ok(Version::new())
    }

    async fn open(
        &mut self,
        id: u32,
        filename: String,
        pflags: OpenFlags,
        _attrs: FileAttributes,
    ) -> Result<Handle, Self::Error> {
        let mut opts = OpenOptions::new();
        opts.read(pflags.contains(OpenFlags::READ));
        opts.write(pflags.contains(OpenFlags::WRITE));
        opts.append(pflags.contains(OpenFlags::APPEND));
        opts.create(pflags.contains(OpenFlags::CREATE));
        opts.truncate(pflags.contains(OpenFlags::TRUNCATE));

        let file = opts.open(&filename).await.map_err(|e| {
            warn!(path = %filename, error = %e, "sftp open failed");
            io_error_code(&e)
        })?;

        let handle = self.alloc_handle(OpenHandle::File(file));
        Ok(Handle { id, handle })
    }

    async fn close(&mut self, id: u32, handle: String) -> Result<Status, Self::Error> {
        self.handles.remove(&handle);
        Ok(status(id, StatusCode::Ok, "ok"))
    }

    async fn read(
        &mut self,
        id: u32,
        handle: String,
        offset: u64,
        len: u32,
    ) -> Result<Data, Self::Error> {
        let Some(OpenHandle::File(file)) = self.handles.get_mut(&handle) else {
            return Err(StatusCode::Failure);
        };
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| io_error_code(&e))?;
        let mut buf = vec![0u8; len as usize];
        let n = file.read(&mut buf).await.map_err(|e| io_error_code(&e))?;
        if n == 0 {
            return Err(StatusCode::Eof);
        }
        buf.truncate(n);
        Ok(Data { id, data: buf })
    }

    async fn write(
        &mut self,
        id: u32,
        handle: String,
        offset: u64,
        data: Vec<u8>,
    ) -> Result<Status, Self::Error> {
        let Some(OpenHandle::File(file)) = self.handles.get_mut(&handle) else {
            return Err(StatusCode::Failure);
        };
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| io_error_code(&e))?;
        file.write_all(&data).await.map_err(|e| io_error_code(&e))?;
        Ok(status(id, StatusCode::Ok, "ok"))
    }

    async fn lstat(&mut self, id: u32, path: String) -> Result<Attrs, Self::Error> {
        let meta = fs::symlink_metadata(&path)
            .await
            .map_err(|e| io_error_code(&e))?;
        Ok(Attrs {
            id,
            attrs: Self::metadata_to_attrs(&meta),
        })
    }

    async fn fstat(&mut self, id: u32, handle: String) -> Result<Attrs, Self::Error> {
        let Some(OpenHandle::File(file)) = self.handles.get(&handle) else {
            return Err(StatusCode::Failure);
        };
        let meta = file.metadata().await.map_err(|e| io_error_code(&e))?;
        Ok(Attrs {
            id,
            attrs: Self::metadata_to_attrs(&meta),
        })
    }

    async fn setstat(
        &mut self,
        id: u32,
        path: String,
        attrs: FileAttributes,
    ) -> Result<Status, Self::Error> {
        #[cfg(unix)]
        if let Some(mode) = attrs.permissions {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| io_error_code(&e))?;
        }
        Ok(status(id, StatusCode::Ok, "ok"))
    }

    async fn opendir(&mut self, id: u32, path: String) -> Result<Handle, Self::Error> {
        let mut rd = fs::read_dir(&path).await.map_err(|e| io_error_code(&e))?;
        let mut entries = Vec::new();
        while let Some(entry) = rd.next_entry().await.map_err(|e| io_error_code(&e))? {
            entries.push(entry.file_name().to_string_lossy().into_owned());
        }
        let handle = self.alloc_handle(OpenHandle::Dir { entries, pos: 0 });
        Ok(Handle { id, handle })
    }

    async fn readdir(&mut self, id: u32, handle: String) -> Result<Name, Self::Error> {
        let Some(OpenHandle::Dir { entries, pos }) = self.handles.get_mut(&handle) else {
            return Err(StatusCode::Failure);
        };
        if *pos >= entries.len() {
            return Err(StatusCode::Eof);
        }
        let name = entries[*pos].clone();
        *pos += 1;
        Ok(Name {
            id,
            files: vec![File {
                filename: name.clone(),
                longname: name,
                attrs: FileAttributes::default(),
            }],
        })
    }

    async fn remove(&mut self, id: u32, filename: String) -> Result<Status, Self::Error> {
        fs::remove_file(&filename)
            .await
            .map_err(|e| io_error_code(&e))?;
        Ok(status(id, StatusCode::Ok, "ok"))
    }

    async fn mkdir(
        &mut self,
        id: u32,
        path: String,
        _attrs: FileAttributes,
    ) -> Result<Status, Self::Error> {
        fs::create_dir(&path).await.map_err(|e| io_error_code(&e))?;
        Ok(status(id, StatusCode::Ok, "ok"))
    }

    async fn rmdir(&mut self, id: u32, path: String) -> Result<Status, Self::Error> {
        fs::remove_dir(&path).await.map_err(|e| io_error_code(&e))?;
        Ok(status(id, StatusCode::Ok, "ok"))
    }

    async fn rename(
        &mut self,
        id: u32,
        oldpath: String,
        newpath: String,
    ) -> Result<Status, Self::Error> {
        fs::rename(&oldpath, &newpath)
            .await
            .map_err(|e| io_error_code(&e))?;
        Ok(status(id, StatusCode::Ok, "ok"))
    }

    async fn realpath(&mut self, id: u32, path: String) -> Result<Name, Self::Error> {
        let resolved = fs::canonicalize(&path)
            .await
            .unwrap_or_else(|_| PathBuf::from(&path));
        let filename = resolved.to_string_lossy().into_owned();
        Ok(Name {
            id,
            files: vec![File {
                filename: filename.clone(),
                longname: filename,
                attrs: FileAttributes::default(),
            }],
        })
    }

    async fn stat(&mut self, id: u32, path: String) -> Result<Attrs, Self::Error> {
        let meta = fs::metadata(&path).await.map_err(|e| io_error_code(&e))?;
        Ok(Attrs {
            id,
            attrs: Self::metadata_to_attrs(&meta),
        })
    }
}
