use anyhow::Context;
use clap::{Parser, Subcommand};
use hcichan::hci::{self, constants::*, DeviceInfo};
use hcichan::{DeviceSelector, HciSocket, OpenConfig};
use log::info;
use std::time::Duration;

/// Inspect Bluetooth controllers and talk to them over the HCI user channel
#[derive(Parser, Debug)]
#[command(name = "hcichanctl", version, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the controllers known to the kernel
    List,
    /// Show the kernel's descriptor of a controller
    Info { dev_id: u16 },
    /// Bring a controller up
    Up { dev_id: u16 },
    /// Take a controller down
    Down { dev_id: u16 },
    /// Reset a controller through the kernel
    Reset { dev_id: u16 },
    /// Open a user channel and print every frame the controller sends
    Dump {
        /// Controller index, -1 for the first available one
        #[arg(short, long, default_value_t = HCI_DEV_ANY, allow_hyphen_values = true)]
        index: i32,

        /// Stop after this many frames
        #[arg(short, long)]
        count: Option<usize>,

        /// Send an HCI_Reset command once the channel is open
        #[arg(long, default_value_t = false)]
        send_reset: bool,

        /// How long to wait for stale input after binding, in milliseconds
        #[arg(long, default_value_t = 20)]
        drain_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    match args.command {
        Command::List => {
            let devices = hci::devices().context("listing controllers")?;
            if devices.is_empty() {
                println!("no controllers");
            }
            for dev in &devices {
                println!("hci{}\t{}\t{}", dev.dev_id, dev.address, dev.flags);
            }
        }
        Command::Info { dev_id } => {
            let dev = hci::info(dev_id)
                .with_context(|| format!("reading hci{}", dev_id))?;
            print_info(&dev);
        }
        Command::Up { dev_id } => {
            hci::up(dev_id)
                .with_context(|| format!("bringing hci{} up", dev_id))?;
        }
        Command::Down { dev_id } => {
            hci::down(dev_id)
                .with_context(|| format!("taking hci{} down", dev_id))?;
        }
        Command::Reset { dev_id } => {
            hci::reset(dev_id)
                .with_context(|| format!("resetting hci{}", dev_id))?;
        }
        Command::Dump {
            index,
            count,
            send_reset,
            drain_ms,
        } => dump(index, count, send_reset, drain_ms)?,
    }

    Ok(())
}

fn print_info(dev: &DeviceInfo) {
    println!("hci{}:\tType: {}  Name: {}", dev.dev_id, dev.dev_type, dev.name);
    println!(
        "\tBD Address: {}  ACL MTU: {}:{}  SCO MTU: {}:{}",
        dev.address, dev.acl_mtu, dev.acl_pkts, dev.sco_mtu, dev.sco_pkts
    );
    println!("\t{}", dev.flags);
    println!("\tFeatures: 0x{}", dev.features_hex());
    println!(
        "\tPacket type: {:#x}  Link policy: {:#x}  Link mode: {:#x}",
        dev.pkt_type, dev.link_policy, dev.link_mode
    );

    let s = &dev.stats;
    println!(
        "\tRX bytes:{} acl:{} sco:{} events:{} errors:{}",
        s.byte_rx, s.acl_rx, s.sco_rx, s.evt_rx, s.err_rx
    );
    println!(
        "\tTX bytes:{} acl:{} sco:{} commands:{} errors:{}",
        s.byte_tx, s.acl_tx, s.sco_tx, s.cmd_tx, s.err_tx
    );
}

fn packet_kind(indicator: u8) -> &'static str {
    match indicator {
        HCI_COMMAND_PKT => "CMD",
        HCI_ACL_PKT => "ACL",
        HCI_SCO_PKT => "SCO",
        HCI_EVENT_PKT => "EVT",
        HCI_ISO_PKT => "ISO",
        _ => "???",
    }
}

fn dump(index: i32, count: Option<usize>, send_reset: bool, drain_ms: u64) -> anyhow::Result<()> {
    let selector = DeviceSelector::from_index(index)?;
    let config = OpenConfig {
        drain_timeout: Duration::from_millis(drain_ms),
        ..OpenConfig::default()
    };

    let sock = HciSocket::open_with_config(selector, &config)
        .context("opening user channel")?;
    info!("opened user channel on hci{}", sock.dev_id());

    if send_reset {
        sock.write(&[HCI_COMMAND_PKT, 0x03, 0x0c, 0x00])
            .context("sending HCI_Reset")?;
    }

    let mut buf = [0u8; 1024];
    let mut seen = 0;
    while count.map_or(true, |max| seen < max) {
        let n = sock.read(&mut buf)?;
        if n == 0 {
            break;
        }
        println!("{} {}", packet_kind(buf[0]), hex::encode(&buf[..n]));
        seen += 1;
    }

    sock.close().context("closing user channel")?;
    Ok(())
}
