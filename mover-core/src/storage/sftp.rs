use super::ftp::resolve_addr;
use super::remote::{RemoteBackend, RemoteConnector, RemoteSession};
use super::{AuthMethod, EntryType, RemoteEntry, StorageSettings};
use crate::constants::protocol::{SFTP, SFTP_DEFAULT_PORT};
use crate::error::{MoverError, Result};
use chrono::{DateTime, Utc};
use ssh2::{ErrorCode, Session, Sftp};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// SFTP 中"文件不存在"的状态码
const SFTP_NO_SUCH_FILE: i32 = 2;

/// SFTP 存储
pub type SftpBackend = RemoteBackend<SftpConnector>;

/// SFTP 连接器
#[derive(Debug, Clone, Default)]
pub struct SftpConnector;

fn ssh_err(action: &str, e: ssh2::Error) -> MoverError {
    MoverError::transfer(format!("SFTP {action}失败: {e}"))
}

fn is_not_found(e: &ssh2::Error) -> bool {
    matches!(e.code(), ErrorCode::SFTP(SFTP_NO_SUCH_FILE))
}

/// 用户认证，私钥内容先写入临时文件
fn authenticate(session: &Session, settings: &StorageSettings) -> Result<()> {
    match settings.auth_method {
        AuthMethod::Password => session
            .userauth_password(&settings.username, &settings.password)
            .map_err(|e| ssh_err("密码认证", e))?,
        AuthMethod::Key => {
            let key = settings
                .private_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| MoverError::validation("密钥认证需要配置 private_key"))?;

            let mut key_file = tempfile::NamedTempFile::new()?;
            key_file.write_all(key.as_bytes())?;
            key_file.flush()?;

            let passphrase = (!settings.password.is_empty()).then_some(settings.password.as_str());
            session
                .userauth_pubkey_file(&settings.username, None, key_file.path(), passphrase)
                .map_err(|e| ssh_err("密钥认证", e))?;
        }
    }

    if !session.authenticated() {
        return Err(MoverError::transfer("SFTP 认证失败"));
    }
    Ok(())
}

impl RemoteConnector for SftpConnector {
    fn protocol(&self) -> &'static str {
        SFTP
    }

    fn default_port(&self) -> u16 {
        SFTP_DEFAULT_PORT
    }

    fn connect(&self, settings: &StorageSettings) -> Result<Box<dyn RemoteSession>> {
        let port = settings.port_or(SFTP_DEFAULT_PORT);
        let addr = resolve_addr(&settings.host, port)?;
        let timeout = Duration::from_secs(settings.timeout_secs.max(1));

        debug!("连接 SFTP 服务器: {}", addr);
        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| MoverError::transfer(format!("SFTP 连接 {addr} 失败: {e}")))?;
        tcp.set_read_timeout(Some(timeout))?;
        tcp.set_write_timeout(Some(timeout))?;

        let mut session = Session::new().map_err(|e| ssh_err("创建会话", e))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake().map_err(|e| ssh_err("握手", e))?;

        let prepared = authenticate(&session, settings)
            .and_then(|()| session.sftp().map_err(|e| ssh_err("打开子系统", e)));

        match prepared {
            Ok(sftp) => Ok(Box::new(SftpSession { session, sftp })),
            Err(e) => {
                let _ = session.disconnect(None, "authentication failed", None);
                Err(e)
            }
        }
    }
}

struct SftpSession {
    session: Session,
    sftp: Sftp,
}

impl RemoteSession for SftpSession {
    fn mkdir(&mut self, path: &str) -> Result<()> {
        self.sftp
            .mkdir(Path::new(path), 0o755)
            .map_err(|e| ssh_err("创建目录", e))
    }

    fn put(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64> {
        let mut file = self
            .sftp
            .create(Path::new(path))
            .map_err(|e| ssh_err("创建远程文件", e))?;
        let bytes = io::copy(reader, &mut file)?;
        file.flush()?;
        Ok(bytes)
    }

    fn get(&mut self, path: &str, writer: &mut dyn Write) -> Result<u64> {
        let mut file = self
            .sftp
            .open(Path::new(path))
            .map_err(|e| ssh_err("打开远程文件", e))?;
        Ok(io::copy(&mut file, writer)?)
    }

    fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let items = self
            .sftp
            .readdir(Path::new(path))
            .map_err(|e| ssh_err("列出目录", e))?;

        Ok(items
            .into_iter()
            .filter_map(|(item_path, stat)| {
                let name = item_path.file_name()?.to_string_lossy().to_string();
                let entry_type = if stat.is_dir() {
                    EntryType::Directory
                } else {
                    EntryType::File
                };
                Some(RemoteEntry {
                    name,
                    size: stat.is_file().then_some(stat.size).flatten(),
                    entry_type,
                    modified_at: stat
                        .mtime
                        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0)),
                })
            })
            .collect())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        self.sftp
            .unlink(Path::new(path))
            .map_err(|e| ssh_err("删除", e))
    }

    fn size(&mut self, path: &str) -> Result<Option<u64>> {
        match self.sftp.stat(Path::new(path)) {
            Ok(stat) if stat.is_dir() => Ok(None),
            Ok(stat) => Ok(Some(stat.size.unwrap_or(0))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(ssh_err("读取文件信息", e)),
        }
    }

    fn close(self: Box<Self>) {
        let SftpSession { session, sftp } = *self;
        drop(sftp);
        if let Err(e) = session.disconnect(None, "bye", None) {
            debug!("关闭 SFTP 连接失败: {}", e);
        }
    }
}
