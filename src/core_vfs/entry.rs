use chrono::{DateTime, Datelike, Utc};

// Capability bits a backend grants the requesting identity on one entry.
pub const CAP_READ: u32 = 1 << 0;
pub const CAP_WRITE: u32 = 1 << 1;
pub const CAP_APPEND: u32 = 1 << 2;
pub const CAP_LIST: u32 = 1 << 3;
pub const CAP_CREATE: u32 = 1 << 4;
pub const CAP_MKDIR: u32 = 1 << 5;
pub const CAP_RENAME: u32 = 1 << 6;
pub const CAP_DELETE: u32 = 1 << 7;
pub const CAP_ENTER: u32 = 1 << 8;

/// How much detail a listing call must fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    NameOnly,
    Basic,
    Full,
}

/// One backend-returned listing record. Produced transiently per
/// LIST/MLSD/stat call, never persisted.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub mtime: Option<DateTime<Utc>>,
    pub caps: u32,
}

impl DirEntry {
    pub fn synthetic_dir(name: &str) -> Self {
        DirEntry {
            name: name.to_string(),
            is_dir: true,
            size: 0,
            mtime: None,
            caps: CAP_LIST | CAP_ENTER,
        }
    }

    pub fn has_cap(&self, cap: u32) -> bool {
        self.caps & cap != 0
    }

    /// Classic `ls -l` style line for LIST.
    pub fn format_long(&self) -> String {
        let kind = if self.is_dir { 'd' } else { '-' };
        let mut perms = String::new();
        perms.push(if self.has_cap(CAP_READ) || self.has_cap(CAP_LIST) {
            'r'
        } else {
            '-'
        });
        perms.push(if self.has_cap(CAP_WRITE) || self.has_cap(CAP_CREATE) {
            'w'
        } else {
            '-'
        });
        perms.push(if self.is_dir && self.has_cap(CAP_ENTER) {
            'x'
        } else {
            '-'
        });
        let stamp = match self.mtime {
            Some(t) => {
                // Recent entries carry the time, older ones the year.
                let now = Utc::now();
                if now.year() == t.year() {
                    t.format("%b %e %H:%M").to_string()
                } else {
                    t.format("%b %e  %Y").to_string()
                }
            }
            None => "Jan  1  1970".to_string(),
        };
        format!(
            "{}{}{} 1 ftp ftp {:>12} {} {}",
            kind, perms, "------", self.size, stamp, self.name
        )
    }

    /// MLSD/MLST fact line: `type=..;size=..;modify=..;perm=..; name`.
    pub fn format_facts(&self) -> String {
        let kind = if self.is_dir { "dir" } else { "file" };
        let modify = self
            .mtime
            .map(|t| t.format("%Y%m%d%H%M%S").to_string())
            .unwrap_or_else(|| "19700101000000".to_string());
        let mut perm = String::new();
        if self.is_dir {
            if self.has_cap(CAP_ENTER) {
                perm.push('e');
            }
            if self.has_cap(CAP_LIST) {
                perm.push('l');
            }
            if self.has_cap(CAP_MKDIR) {
                perm.push('m');
            }
            if self.has_cap(CAP_CREATE) {
                perm.push('c');
            }
        } else {
            if self.has_cap(CAP_READ) {
                perm.push('r');
            }
            if self.has_cap(CAP_WRITE) {
                perm.push('w');
            }
            if self.has_cap(CAP_APPEND) {
                perm.push('a');
            }
        }
        if self.has_cap(CAP_DELETE) {
            perm.push('d');
        }
        if self.has_cap(CAP_RENAME) {
            perm.push('f');
        }
        format!(
            "type={};size={};modify={};perm={}; {}",
            kind, self.size, modify, perm, self.name
        )
    }

    /// Listing line for the requested mode; NameOnly is the NLST form.
    pub fn format(&self, level: DetailLevel) -> String {
        match level {
            DetailLevel::NameOnly => self.name.clone(),
            DetailLevel::Basic => self.format_long(),
            DetailLevel::Full => self.format_facts(),
        }
    }
}
