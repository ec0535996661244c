use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::utils::CommandContext;

// Endpoint negotiation lives with the rest of the data-channel plumbing.
use crate::core_network::pasv;
use crate::core_network::port;

type CommandHandler = Box<
    dyn Fn(
            CommandContext,
            String, // Argument text after the verb
        ) -> Pin<Box<dyn Future<Output = Result<(), std::io::Error>> + Send>>
        + Send
        + Sync,
>;

macro_rules! handler {
    ($func:path) => {{
        let handler: CommandHandler = Box::new(|ctx, arg| Box::pin($func(ctx, arg)));
        Arc::new(handler)
    }};
}

pub fn initialize_command_handlers() -> HashMap<FtpCommand, Arc<CommandHandler>> {
    let mut handlers: HashMap<FtpCommand, Arc<CommandHandler>> = HashMap::new();

    handlers.insert(
        FtpCommand::USER,
        handler!(crate::core_ftpcommand::user::handle_user_command),
    );
    handlers.insert(
        FtpCommand::PASS,
        handler!(crate::core_ftpcommand::pass::handle_pass_command),
    );
    handlers.insert(
        FtpCommand::AUTH,
        handler!(crate::core_ftpcommand::auth::handle_auth_command),
    );
    handlers.insert(
        FtpCommand::FEAT,
        handler!(crate::core_ftpcommand::feat::handle_feat_command),
    );
    handlers.insert(
        FtpCommand::SYST,
        handler!(crate::core_ftpcommand::syst::handle_syst_command),
    );
    handlers.insert(
        FtpCommand::NOOP,
        handler!(crate::core_ftpcommand::noop::handle_noop_command),
    );
    handlers.insert(
        FtpCommand::QUIT,
        handler!(crate::core_ftpcommand::quit::handle_quit_command),
    );
    handlers.insert(
        FtpCommand::PWD,
        handler!(crate::core_ftpcommand::pwd::handle_pwd_command),
    );
    handlers.insert(
        FtpCommand::CWD,
        handler!(crate::core_ftpcommand::cwd::handle_cwd_command),
    );
    handlers.insert(
        FtpCommand::CDUP,
        handler!(crate::core_ftpcommand::cdup::handle_cdup_command),
    );
    handlers.insert(
        FtpCommand::MKD,
        handler!(crate::core_ftpcommand::mkd::handle_mkd_command),
    );
    handlers.insert(
        FtpCommand::RMD,
        handler!(crate::core_ftpcommand::rmd::handle_rmd_command),
    );
    handlers.insert(
        FtpCommand::DELE,
        handler!(crate::core_ftpcommand::dele::handle_dele_command),
    );
    handlers.insert(
        FtpCommand::TYPE,
        handler!(crate::core_ftpcommand::type_::handle_type_command),
    );
    handlers.insert(
        FtpCommand::MODE,
        handler!(crate::core_ftpcommand::mode::handle_mode_command),
    );
    handlers.insert(
        FtpCommand::SIZE,
        handler!(crate::core_ftpcommand::size::handle_size_command),
    );
    handlers.insert(
        FtpCommand::MDTM,
        handler!(crate::core_ftpcommand::mdtm::handle_mdtm_command),
    );
    handlers.insert(
        FtpCommand::MLST,
        handler!(crate::core_ftpcommand::mlst::handle_mlst_command),
    );
    handlers.insert(
        FtpCommand::MLSD,
        handler!(crate::core_ftpcommand::list::handle_mlsd_command),
    );
    handlers.insert(
        FtpCommand::LIST,
        handler!(crate::core_ftpcommand::list::handle_list_command),
    );
    handlers.insert(
        FtpCommand::NLST,
        handler!(crate::core_ftpcommand::list::handle_nlst_command),
    );
    handlers.insert(FtpCommand::PASV, handler!(pasv::handle_pasv_command));
    handlers.insert(FtpCommand::SPAS, handler!(pasv::handle_spas_command));
    handlers.insert(FtpCommand::PORT, handler!(port::handle_port_command));
    handlers.insert(FtpCommand::SPOR, handler!(port::handle_spor_command));
    handlers.insert(
        FtpCommand::REST,
        handler!(crate::core_ftpcommand::rest::handle_rest_command),
    );
    handlers.insert(
        FtpCommand::ERET,
        handler!(crate::core_ftpcommand::rest::handle_eret_command),
    );
    handlers.insert(
        FtpCommand::RETR,
        handler!(crate::core_ftpcommand::retr::handle_retr_command),
    );
    handlers.insert(
        FtpCommand::STOR,
        handler!(crate::core_ftpcommand::stor::handle_stor_command),
    );
    handlers.insert(
        FtpCommand::ABOR,
        handler!(crate::core_ftpcommand::abor::handle_abor_command),
    );
    handlers.insert(
        FtpCommand::OPTS,
        handler!(crate::core_ftpcommand::opts::handle_opts_command),
    );
    handlers.insert(
        FtpCommand::SBUF,
        handler!(crate::core_ftpcommand::opts::handle_sbuf_command),
    );
    handlers.insert(
        FtpCommand::PBSZ,
        handler!(crate::core_ftpcommand::prot::handle_pbsz_command),
    );
    handlers.insert(
        FtpCommand::PROT,
        handler!(crate::core_ftpcommand::prot::handle_prot_command),
    );
    handlers.insert(
        FtpCommand::DCAU,
        handler!(crate::core_ftpcommand::prot::handle_dcau_command),
    );

    handlers
}
