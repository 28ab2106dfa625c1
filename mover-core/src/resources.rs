//! 运行期间的资源上限调整，均为尽力而为

use tracing::{debug, warn};

/// 解析内存上限，例如 `512M`、`1G`、`65536K`、纯字节数；`-1` 表示不限制
pub fn parse_memory_limit(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() || value == "-1" {
        return None;
    }

    let (digits, multiplier) = match value.chars().last()?.to_ascii_uppercase() {
        'K' => (&value[..value.len() - 1], 1024u64),
        'M' => (&value[..value.len() - 1], 1024 * 1024),
        'G' => (&value[..value.len() - 1], 1024 * 1024 * 1024),
        _ => (value, 1),
    };

    digits.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}

/// 尝试把进程地址空间软上限提高到 `limit_bytes`，只升不降
///
/// 返回是否实际调整；不支持的平台或权限不足时返回 false。
#[cfg(unix)]
pub fn raise_memory_ceiling(limit_bytes: u64) -> bool {
    use nix::sys::resource::{RLIM_INFINITY, Resource, getrlimit, setrlimit};

    let (soft, hard) = match getrlimit(Resource::RLIMIT_AS) {
        Ok(limits) => limits,
        Err(e) => {
            warn!("读取内存上限失败: {}", e);
            return false;
        }
    };

    if soft == RLIM_INFINITY || soft >= limit_bytes {
        debug!("当前内存上限已满足要求");
        return false;
    }

    let target = if hard == RLIM_INFINITY {
        limit_bytes
    } else {
        limit_bytes.min(hard)
    };
    if target <= soft {
        return false;
    }

    match setrlimit(Resource::RLIMIT_AS, target, hard) {
        Ok(()) => {
            debug!("内存上限已调整为 {} 字节", target);
            true
        }
        Err(e) => {
            warn!("调整内存上限失败，继续执行: {}", e);
            false
        }
    }
}

#[cfg(not(unix))]
pub fn raise_memory_ceiling(_limit_bytes: u64) -> bool {
    debug!("当前平台不支持调整内存上限");
    false
}
