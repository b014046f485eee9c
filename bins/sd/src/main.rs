//! sd command - dump kernel socket tables via NETLINK_SOCK_DIAG.

use std::path::PathBuf;

use clap::Parser;
use sdiag::addr::{ntohs, to_addr_with_family};
use sdiag::types::{ALL_STATES, ext};
use sdiag::{AddressFamily, Config, Diag, InetQuery, InetSocket, Protocol, UnixSocket};

#[derive(Parser)]
#[command(name = "sd", version, about = "Socket diagnostics dump utility")]
struct Cli {
    /// Dump TCP sockets.
    #[arg(short = 't', long)]
    tcp: bool,

    /// Dump UDP sockets.
    #[arg(short = 'u', long)]
    udp: bool,

    /// Dump raw sockets.
    #[arg(short = 'w', long)]
    raw: bool,

    /// Dump Unix sockets.
    #[arg(short = 'x', long)]
    unix: bool,

    /// Request memory info attributes.
    #[arg(short = 'm', long)]
    memory: bool,

    /// Request protocol info attributes (tcp_info etc.).
    #[arg(short = 'i', long)]
    info: bool,

    /// Query this network namespace file instead of the caller's.
    #[arg(long, value_name = "PATH")]
    netns: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(short = 'j', long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let diag = Diag::open(&Config {
        netns: cli.netns.clone(),
        ..Default::default()
    })?;

    // TCP is the default when nothing is selected.
    let query_tcp = cli.tcp || (!cli.udp && !cli.raw && !cli.unix);

    let mut ext_mask = 0u8;
    if cli.memory {
        ext_mask |= ext::MEMINFO | ext::SKMEMINFO;
    }
    if cli.info {
        ext_mask |= ext::INFO | ext::VEGASINFO | ext::CONG;
    }

    let mut inet_results = Vec::new();
    let mut unix_results = Vec::new();

    let mut protocols = Vec::new();
    if query_tcp {
        protocols.push(Protocol::Tcp);
    }
    if cli.udp {
        protocols.push(Protocol::Udp);
    }
    if cli.raw {
        protocols.push(Protocol::Raw);
    }

    for protocol in protocols {
        for family in [AddressFamily::Inet, AddressFamily::Inet6] {
            let query = InetQuery {
                family,
                protocol,
                states: ALL_STATES,
                ext: ext_mask,
            };
            inet_results.extend(diag.dump_inet(&query).await?);
        }
    }

    if cli.unix {
        unix_results = diag.dump_unix().await?;
    }

    if cli.json {
        let json = serde_json::json!({
            "inet": inet_results,
            "unix": unix_results,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for sock in &inet_results {
            print_inet(sock);
        }
        for sock in &unix_results {
            print_unix(sock);
        }
    }

    Ok(())
}

fn print_inet(sock: &InetSocket) {
    let src = to_addr_with_family(sock.msg.family, &sock.msg.id.src);
    let dst = to_addr_with_family(sock.msg.family, &sock.msg.id.dst);
    let (Ok(src), Ok(dst)) = (src, dst) else {
        return;
    };

    let mut line = format!(
        "{}:{} -> {}:{} state={} rq={} wq={} uid={} ino={}",
        src,
        ntohs(sock.msg.id.sport),
        dst,
        ntohs(sock.msg.id.dport),
        sock.msg.state,
        sock.msg.rqueue,
        sock.msg.wqueue,
        sock.msg.uid,
        sock.msg.inode,
    );
    if let Some(cong) = &sock.attrs.cong {
        line.push_str(&format!(" cong={cong}"));
    }
    if let Some(info) = &sock.attrs.tcp_info {
        line.push_str(&format!(" rtt={}us cwnd={}", info.rtt, info.snd_cwnd));
    }
    for issue in &sock.issues {
        tracing::warn!(ino = sock.msg.inode, %issue, "decode issue");
    }
    println!("{line}");
}

fn print_unix(sock: &UnixSocket) {
    let name = sock.attrs.name.as_deref().unwrap_or("*");
    let peer = sock
        .attrs
        .peer
        .map(|p| format!(" peer={p}"))
        .unwrap_or_default();
    for issue in &sock.issues {
        tracing::warn!(ino = sock.msg.ino, %issue, "decode issue");
    }
    println!(
        "{} type={} state={} ino={}{}",
        name, sock.msg.kind, sock.msg.state, sock.msg.ino, peer
    );
}
