//! Line-oriented operator console on stdin
//!
//! ```text
//! guide <n|s|e|w> <ms>      start a guide pulse
//! trim [percent]            show or set the RA tracking adjustment
//! speeds [ra dec]           show or set the guiding speeds
//! auto <on|off>             enable or disable RA auto-adjust
//! filter [design order mul] show or rebuild the drift filter
//! axes                      gear ratios and motor positions
//! status                    last reported mount state
//! ```

use anyhow::{anyhow, bail, Context};
use stargo_filter::{FilterDesign, FilterSpec};
use stargo_mount::{AutoAdjustController, Guider, Mount};
use stargo_protocol::{Axis, GuideDirection};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Guide {
        direction: GuideDirection,
        duration_ms: u32,
    },
    GetTrim,
    SetTrim(f64),
    GetSpeeds,
    SetSpeeds {
        ra_percent: u8,
        dec_percent: u8,
    },
    AutoAdjust(bool),
    ShowFilter,
    Filter {
        design: FilterDesign,
        order: u32,
        corner_multiplier: f64,
    },
    Axes,
    Status,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["guide", dir, ms] => ConsoleCommand::Guide {
                direction: parse_direction(dir)?,
                duration_ms: ms.parse().context("pulse length in ms")?,
            },
            ["trim"] => ConsoleCommand::GetTrim,
            ["trim", pct] => ConsoleCommand::SetTrim(pct.parse().context("trim percent")?),
            ["speeds"] => ConsoleCommand::GetSpeeds,
            ["speeds", ra, dec] => ConsoleCommand::SetSpeeds {
                ra_percent: ra.parse().context("RA speed percent")?,
                dec_percent: dec.parse().context("DEC speed percent")?,
            },
            ["auto", "on"] => ConsoleCommand::AutoAdjust(true),
            ["auto", "off"] => ConsoleCommand::AutoAdjust(false),
            ["filter"] => ConsoleCommand::ShowFilter,
            ["filter", design, order, mul] => ConsoleCommand::Filter {
                design: parse_design(design)?,
                order: order.parse().context("filter order")?,
                corner_multiplier: mul.parse().context("corner multiplier")?,
            },
            ["axes"] => ConsoleCommand::Axes,
            ["status"] => ConsoleCommand::Status,
            _ => bail!("unknown command {:?}", line.trim()),
        };
        Ok(command)
    }
}

fn parse_direction(word: &str) -> anyhow::Result<GuideDirection> {
    match word {
        "n" | "north" => Ok(GuideDirection::North),
        "s" | "south" => Ok(GuideDirection::South),
        "e" | "east" => Ok(GuideDirection::East),
        "w" | "west" => Ok(GuideDirection::West),
        _ => Err(anyhow!("unknown direction {:?}", word)),
    }
}

fn parse_design(word: &str) -> anyhow::Result<FilterDesign> {
    match word.to_ascii_lowercase().as_str() {
        "bessel" => Ok(FilterDesign::Bessel),
        "butterworth" => Ok(FilterDesign::Butterworth),
        "chebyshev" => Ok(FilterDesign::Chebyshev),
        _ => Err(anyhow!("unknown filter design {:?}", word)),
    }
}

/// Operator session bound to one mount
pub struct Console<T> {
    pub mount: Mount<T>,
    pub adjust: AutoAdjustController<Mount<T>>,
    pub guider: Guider<T>,
}

impl<T> Console<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Read commands from stdin until it closes
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("reading stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            let result = match ConsoleCommand::parse(&line) {
                Ok(command) => self.execute(command).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!("{}: {:#}", line.trim(), e);
            }
        }
        debug!("stdin closed; console stopped");
        Ok(())
    }

    pub async fn execute(&self, command: ConsoleCommand) -> anyhow::Result<()> {
        match command {
            ConsoleCommand::Guide {
                direction,
                duration_ms,
            } => self.guider.guide(direction, duration_ms).await?,
            ConsoleCommand::GetTrim => {
                let trim = self.mount.get_tracking_adjustment().await?;
                info!("RA tracking adjustment {:+.2}%", trim);
            }
            ConsoleCommand::SetTrim(percent) => {
                if self.adjust.is_enabled() {
                    bail!("auto-adjust owns the trim; turn it off first");
                }
                self.mount.set_tracking_adjustment(percent).await?;
            }
            ConsoleCommand::GetSpeeds => {
                let speeds = self.mount.get_guiding_speeds().await?;
                info!(
                    "Guiding speeds RA {}% DEC {}%",
                    speeds.ra_percent, speeds.dec_percent
                );
            }
            ConsoleCommand::SetSpeeds {
                ra_percent,
                dec_percent,
            } => self.mount.set_guiding_speeds(ra_percent, dec_percent).await?,
            ConsoleCommand::AutoAdjust(true) => self.adjust.enable().await,
            ConsoleCommand::AutoAdjust(false) => self.adjust.disable(),
            ConsoleCommand::ShowFilter => {
                let summary = self.adjust.filter_summary();
                let state = self.adjust.state();
                info!(
                    "{} order {}, corner {:.1} samples, gain {:.4}, correction {:+.1}ms",
                    summary.name,
                    summary.order,
                    summary.corner_period,
                    summary.gain,
                    state.cumulative_correction
                );
            }
            ConsoleCommand::Filter {
                design,
                order,
                corner_multiplier,
            } => {
                let spec = FilterSpec {
                    design,
                    order,
                    corner_multiplier,
                    ..FilterSpec::default()
                };
                self.adjust.rebuild_filter(spec)?;
            }
            ConsoleCommand::Axes => {
                for axis in [Axis::Ra, Axis::Dec] {
                    let ratio = self.mount.gear_ratio(axis).await?;
                    let steps = self.mount.motor_steps(axis).await?;
                    info!("{:?}: gear ratio {}, motor steps {}", axis, ratio, steps);
                }
            }
            ConsoleCommand::Status => {
                info!(
                    "{} (auto-adjust {})",
                    self.mount.state(),
                    if self.adjust.is_enabled() { "on" } else { "off" }
                );
            }
        }
        Ok(())
    }
}
