// SPDX-License-Identifier: MPL-2.0

use anyhow::Context as _;
use floating_notes::{
    app::{PanelCommand, PanelOutput, ServiceModel},
    config::Config,
    logging,
};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};

async fn write_outputs(
    stdout: &mut tokio::io::Stdout,
    outputs: Vec<PanelOutput>,
) -> anyhow::Result<()> {
    for output in outputs {
        let mut line = serde_json::to_string(&output)?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
    }
    stdout.flush().await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // an explicit config file may be given as the only argument
    let config_path = std::env::args_os()
        .nth(1)
        .map(std::path::PathBuf::from)
        .or_else(Config::default_path);
    let config = Config::load_or_default(config_path.as_deref());
    logging::init(config.debug);

    let mut service = ServiceModel::try_new(config).context("failed starting notes service")?;
    let mut stdout = tokio::io::stdout();
    write_outputs(&mut stdout, service.restore_notes()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while service.is_running() {
        let Some(line) = lines.next_line().await? else {
            // input closed: behave as if asked to quit
            let outputs = service.update(PanelCommand::Quit).await;
            write_outputs(&mut stdout, outputs).await?;
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let outputs = match serde_json::from_str::<PanelCommand>(&line) {
            Ok(command) => service.update(command).await,
            Err(e) => {
                tracing::warn!("skip malformed command: {e}");
                vec![PanelOutput::Failed {
                    message: format!("Malformed command: {e}"),
                }]
            }
        };
        write_outputs(&mut stdout, outputs).await?;
    }
    tracing::info!("notes service stopped");
    Ok(())
}
