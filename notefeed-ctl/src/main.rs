use std::{
    fmt::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use notefeed_client::{ExpansionPolicy, NoteFeed, Refresh, ThreadNode, ThreadSnapshot};
use notefeed_mock_server::{Dump, MockServer};

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON dump loaded into the in-memory note service
    #[structopt(short, long, env = "NOTEFEED_DUMP", parse(from_os_str))]
    dump: PathBuf,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print the note thread of the dump's host record
    Render {
        /// Show reply lists of roots by default
        #[structopt(long)]
        expanded: bool,

        /// Print the snapshot as JSON
        #[structopt(long)]
        json: bool,
    },

    /// List the note categories
    Categories,

    /// Search records that notes can be linked to
    Search {
        /// Object type of the records, eg. Contact
        object_type: String,

        term: String,
    },
}

fn load_dump(path: &Path) -> anyhow::Result<Dump> {
    let data = std::fs::read(path).with_context(|| format!("reading dump {path:?}"))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing dump {path:?}"))
}

fn render_node(out: &mut String, n: &ThreadNode, indent: &str) -> fmt::Result {
    let marker = match (n.is_reply, n.expanded) {
        (true, _) => "*",
        (false, true) => "-",
        (false, false) => "+",
    };
    writeln!(
        out,
        "{indent}{marker} [{}] {} ({}, {})",
        n.category,
        n.title,
        n.created_by,
        n.created_display(),
    )?;
    for line in n.body.lines() {
        writeln!(out, "{indent}    {line}")?;
    }
    if let Some(linked) = n.enrichment.display_text() {
        writeln!(out, "{indent}    linked: {linked}")?;
    }
    Ok(())
}

fn render(snapshot: &ThreadSnapshot) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for root in snapshot.roots() {
        render_node(&mut out, root, "")?;
        match (root.expanded, root.reply_count()) {
            (_, 0) => (),
            (true, _) => {
                for reply in root.replies.iter() {
                    render_node(&mut out, reply, "    ")?;
                }
            }
            (false, n) => writeln!(out, "    ({n} replies hidden)")?,
        }
    }
    Ok(out)
}

async fn search(
    feed: &NoteFeed<MockServer>,
    object_type: &str,
    term: &str,
) -> anyhow::Result<Vec<String>> {
    Ok(feed
        .search_records(term, object_type)
        .await?
        .into_iter()
        .map(|hit| format!("{}\t{}", hit.id.0, hit.name))
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let dump = load_dump(&opt.dump)?;
    tracing::debug!(host = ?dump.host, num_notes = dump.notes.len(), "loaded dump");
    let service = MockServer::from_dump(&dump);

    match opt.cmd {
        Command::Render { expanded, json } => {
            let policy = match expanded {
                true => ExpansionPolicy::Expanded,
                false => ExpansionPolicy::Collapsed,
            };
            let feed = NoteFeed::new(service, dump.host, policy);
            let snapshot = match feed.refresh().await? {
                Refresh::Published(s) => s,
                Refresh::Stale => return Err(anyhow!("refresh was superseded")),
            };
            match json {
                true => println!(
                    "{}",
                    serde_json::to_string_pretty(&*snapshot).context("serializing snapshot")?
                ),
                false => print!("{}", render(&snapshot).context("rendering thread")?),
            }
        }
        Command::Categories => {
            let feed = NoteFeed::new(service, dump.host, ExpansionPolicy::default());
            for c in feed.categories().await?.iter() {
                println!("{c}");
            }
        }
        Command::Search { object_type, term } => {
            let feed = NoteFeed::new(service, dump.host, ExpansionPolicy::default());
            for line in search(&feed, &object_type, &term).await? {
                println!("{line}");
            }
        }
    }

    Ok(())
}
