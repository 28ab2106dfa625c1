use super::remote::{RemoteBackend, RemoteConnector, RemoteSession};
use super::{EntryType, RemoteEntry, StorageSettings};
use crate::constants::protocol::{FTP, FTP_DEFAULT_PORT};
use crate::error::{MoverError, Result};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};
use tracing::debug;

/// FTP 存储
pub type FtpBackend = RemoteBackend<FtpConnector>;

/// FTP 连接器
#[derive(Debug, Clone, Default)]
pub struct FtpConnector;

/// 解析主机地址，取第一个可用地址
pub(crate) fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    if host.trim().is_empty() {
        return Err(MoverError::validation("未配置远程主机"));
    }
    (host, port)
        .to_socket_addrs()
        .map_err(|e| MoverError::transfer(format!("无法解析主机 {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| MoverError::transfer(format!("无法解析主机 {host}:{port}")))
}

fn ftp_err(action: &str, e: FtpError) -> MoverError {
    MoverError::transfer(format!("FTP {action}失败: {e}"))
}

impl RemoteConnector for FtpConnector {
    fn protocol(&self) -> &'static str {
        FTP
    }

    fn default_port(&self) -> u16 {
        FTP_DEFAULT_PORT
    }

    fn connect(&self, settings: &StorageSettings) -> Result<Box<dyn RemoteSession>> {
        let port = settings.port_or(FTP_DEFAULT_PORT);
        let addr = resolve_addr(&settings.host, port)?;
        let timeout = Duration::from_secs(settings.timeout_secs.max(1));

        debug!("连接 FTP 服务器: {}", addr);
        let mut stream =
            FtpStream::connect_timeout(addr, timeout).map_err(|e| ftp_err("连接", e))?;

        match prepare_session(&mut stream, settings) {
            Ok(()) => Ok(Box::new(FtpSession { stream })),
            Err(e) => {
                let _ = stream.quit();
                Err(e)
            }
        }
    }
}

/// 登录并设置传输模式
fn prepare_session(stream: &mut FtpStream, settings: &StorageSettings) -> Result<()> {
    stream
        .login(&settings.username, &settings.password)
        .map_err(|e| ftp_err("登录", e))?;
    stream.set_mode(if settings.passive {
        Mode::Passive
    } else {
        Mode::Active
    });
    stream
        .transfer_type(FileType::Binary)
        .map_err(|e| ftp_err("设置传输模式", e))
}

struct FtpSession {
    stream: FtpStream,
}

impl RemoteSession for FtpSession {
    fn mkdir(&mut self, path: &str) -> Result<()> {
        self.stream.mkdir(path).map_err(|e| ftp_err("创建目录", e))
    }

    fn put(&mut self, path: &str, mut reader: &mut dyn Read) -> Result<u64> {
        self.stream
            .put_file(path, &mut reader)
            .map_err(|e| ftp_err("上传", e))
    }

    fn get(&mut self, path: &str, writer: &mut dyn Write) -> Result<u64> {
        self.stream
            .retr(path, |data| {
                io::copy(data, &mut *writer).map_err(FtpError::ConnectionError)
            })
            .map_err(|e| ftp_err("下载", e))
    }

    fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let names = self
            .stream
            .nlst(Some(path))
            .map_err(|e| ftp_err("列出目录", e))?;

        let mut entries = Vec::with_capacity(names.len());
        for raw in names {
            let name = raw.rsplit('/').next().unwrap_or(&raw).to_string();
            if name.is_empty() || name == "." || name == ".." {
                continue;
            }
            let full_path = format!("{}/{}", path.trim_end_matches('/'), name);
            // SIZE 对目录返回错误
            let (size, entry_type) = match self.stream.size(&full_path) {
                Ok(size) => (Some(size as u64), EntryType::File),
                Err(_) => (None, EntryType::Directory),
            };
            entries.push(RemoteEntry {
                name,
                size,
                entry_type,
                modified_at: None,
            });
        }
        Ok(entries)
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        self.stream.rm(path).map_err(|e| ftp_err("删除", e))
    }

    fn size(&mut self, path: &str) -> Result<Option<u64>> {
        match self.stream.size(path) {
            Ok(size) => Ok(Some(size as u64)),
            Err(FtpError::UnexpectedResponse(_)) => Ok(None),
            Err(e) => Err(ftp_err("读取文件大小", e)),
        }
    }

    fn close(mut self: Box<Self>) {
        if let Err(e) = self.stream.quit() {
            debug!("关闭 FTP 连接失败: {}", e);
        }
    }
}
