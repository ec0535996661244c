pub mod abor;
pub mod auth;
pub mod cdup;
pub mod cwd;
pub mod dele;
pub mod feat;
pub mod ftpcommand;
pub mod handlers;
pub mod list;
pub mod mdtm;
pub mod mkd;
pub mod mlst;
pub mod mode;
pub mod noop;
pub mod opts;
pub mod pass;
pub mod prot;
pub mod pwd;
pub mod quit;
pub mod rest;
pub mod retr;
pub mod rmd;
pub mod size;
pub mod stor;
pub mod syst;
pub mod type_;
pub mod user;
pub mod utils;
