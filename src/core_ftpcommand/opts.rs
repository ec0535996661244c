use log::info;

use crate::core_ftpcommand::utils::{reject_empty_arg, reject_if_busy, CommandContext};

/// Handles `OPTS RETR Parallelism=n,n,n;` (and the StripeLayout noise
/// some clients append). Parallelism feeds the buffer plan of the next
/// transfer; changing it mid-transfer is refused.
pub async fn handle_opts_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "OPTS").await? {
        return Ok(());
    }
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    let (target, options) = match arg.trim().split_once(char::is_whitespace) {
        Some((target, options)) => (target, options.trim()),
        None => (arg.trim(), ""),
    };
    if !target.eq_ignore_ascii_case("RETR") {
        return ctx
            .responder
            .send(&format!("501 OPTS {}: not understood.", target))
            .await;
    }
    let parallelism = match parse_parallelism(options) {
        Some(parallelism) => parallelism,
        None => {
            return ctx
                .responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    };
    let ceiling = ctx.config.server.parallelism_ceiling;
    if parallelism == 0 || parallelism > ceiling {
        return ctx
            .responder
            .send(&format!(
                "501 Parallelism must be between 1 and {}.",
                ceiling
            ))
            .await;
    }
    {
        let mut session = ctx.session.lock().await;
        session.parallelism = parallelism;
    }
    info!("parallelism set to {}", parallelism);
    ctx.responder.send("200 OPTS Command Successful.").await
}

/// Handles SBUF: requested TCP buffer size, recorded as a session
/// attribute and applied opportunistically to future data sockets.
pub async fn handle_sbuf_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "SBUF").await? {
        return Ok(());
    }
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    let size: usize = match arg.trim().parse() {
        Ok(size) if size > 0 => size,
        _ => {
            return ctx
                .responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    };
    {
        let mut session = ctx.session.lock().await;
        session.tcp_buffer = Some(size);
    }
    ctx.responder
        .send(&format!("200 SBUF size set to {}.", size))
        .await
}

/// Extracts the value of `Parallelism=a,b,c;` from an OPTS RETR option
/// string. The three comma-separated values must agree.
fn parse_parallelism(options: &str) -> Option<u32> {
    for clause in options.split(';') {
        let (key, value) = clause.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("Parallelism") {
            continue;
        }
        let values: Vec<u32> = value
            .split(',')
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .ok()?;
        let first = *values.first()?;
        if values.iter().any(|v| *v != first) {
            return None;
        }
        return Some(first);
    }
    None
}
