use crate::core_ftpcommand::utils::CommandContext;

/// Handles FEAT: advertises the extended command surface as a multi-line
/// 211 block.
pub async fn handle_feat_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    let features = [
        "AUTH GSSAPI".to_string(),
        "DCAU".to_string(),
        "ERET".to_string(),
        "MDTM".to_string(),
        "MLST type*;size*;modify*;unix.mode*;".to_string(),
        "PARALLEL".to_string(),
        "PBSZ".to_string(),
        "PROT".to_string(),
        "REST STREAM".to_string(),
        "SBUF".to_string(),
        "SIZE".to_string(),
        "SPAS".to_string(),
        "SPOR".to_string(),
    ];
    ctx.responder
        .send_block(211, "Extensions supported:", &features, "End.")
        .await
}
