/// The transfer-relevant command surface.
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    USER,
    PASS,
    AUTH,
    FEAT,
    SYST,
    NOOP,
    QUIT,
    PWD,
    CWD,
    CDUP,
    MKD,
    RMD,
    DELE,
    TYPE,
    MODE,
    SIZE,
    MDTM,
    MLST,
    MLSD,
    LIST,
    NLST,
    PASV,
    PORT,
    SPAS,
    SPOR,
    REST,
    ERET,
    RETR,
    STOR,
    ABOR,
    OPTS,
    SBUF,
    PBSZ,
    PROT,
    DCAU,
}

impl FtpCommand {
    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        match cmd.to_ascii_uppercase().as_str() {
            "USER" => Some(FtpCommand::USER),
            "PASS" => Some(FtpCommand::PASS),
            "AUTH" => Some(FtpCommand::AUTH),
            "FEAT" => Some(FtpCommand::FEAT),
            "SYST" => Some(FtpCommand::SYST),
            "NOOP" => Some(FtpCommand::NOOP),
            "QUIT" => Some(FtpCommand::QUIT),
            "PWD" | "XPWD" => Some(FtpCommand::PWD),
            "CWD" | "XCWD" => Some(FtpCommand::CWD),
            "CDUP" => Some(FtpCommand::CDUP),
            "MKD" | "XMKD" => Some(FtpCommand::MKD),
            "RMD" | "XRMD" => Some(FtpCommand::RMD),
            "DELE" => Some(FtpCommand::DELE),
            "TYPE" => Some(FtpCommand::TYPE),
            "MODE" => Some(FtpCommand::MODE),
            "SIZE" => Some(FtpCommand::SIZE),
            "MDTM" => Some(FtpCommand::MDTM),
            "MLST" => Some(FtpCommand::MLST),
            "MLSD" => Some(FtpCommand::MLSD),
            "LIST" => Some(FtpCommand::LIST),
            "NLST" => Some(FtpCommand::NLST),
            "PASV" => Some(FtpCommand::PASV),
            "PORT" => Some(FtpCommand::PORT),
            "SPAS" => Some(FtpCommand::SPAS),
            "SPOR" => Some(FtpCommand::SPOR),
            "REST" => Some(FtpCommand::REST),
            "ERET" => Some(FtpCommand::ERET),
            "RETR" => Some(FtpCommand::RETR),
            "STOR" => Some(FtpCommand::STOR),
            "ABOR" => Some(FtpCommand::ABOR),
            "OPTS" => Some(FtpCommand::OPTS),
            "SBUF" => Some(FtpCommand::SBUF),
            "PBSZ" => Some(FtpCommand::PBSZ),
            "PROT" => Some(FtpCommand::PROT),
            "DCAU" => Some(FtpCommand::DCAU),
            _ => None,
        }
    }

    /// Commands usable before authentication completes.
    pub fn allowed_unauthenticated(&self) -> bool {
        matches!(
            self,
            FtpCommand::USER
                | FtpCommand::PASS
                | FtpCommand::AUTH
                | FtpCommand::FEAT
                | FtpCommand::SYST
                | FtpCommand::NOOP
                | FtpCommand::QUIT
                | FtpCommand::PBSZ
                | FtpCommand::PROT
                | FtpCommand::DCAU
        )
    }
}
