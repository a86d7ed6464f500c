use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::sync::Arc;

use phrasal::{
    english, Enumeration, GraphBuilder, Integer, Intents, IntentsBuilder, ResolveOptions,
};

/// Match text against a small set of sample intents
#[derive(Parser, Debug)]
#[command(name = "intent_demo", version, about)]
struct Args {
    /// Text to resolve
    text: Vec<String>,

    /// Resolve incomplete input (typeahead style)
    #[arg(long)]
    partial: bool,

    /// Tolerate filler words between phrase words
    #[arg(long)]
    fuzzy: bool,

    /// Trace every traversal step at debug level
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let intents = build_intents()?;
    let text = args.text.join(" ");
    if text.trim().is_empty() {
        println!("usage: intent_demo [--partial] [--fuzzy] <text>");
        return Ok(());
    }

    let options = ResolveOptions {
        partial: args.partial,
        fuzzy: args.fuzzy,
        verbose: args.verbose,
    };

    let resolved = intents.match_text(&text, &options)?;
    if resolved.is_empty() {
        println!("No intent matched '{}'", text);
        return Ok(());
    }

    for (i, intent) in resolved.iter().enumerate() {
        println!(
            "{}. {} (score: {:.3}{})",
            i + 1,
            intent.intent,
            intent.score,
            if intent.partial { ", partial" } else { "" }
        );
        println!("{}", serde_json::to_string_pretty(&intent.values)?);
    }
    Ok(())
}

fn build_intents() -> Result<Intents> {
    let lang = english();

    let time = GraphBuilder::new(Arc::clone(&lang))
        .name("time")
        .add([phrasal::PhrasePart::value("hour", Integer::new()), phrasal::PhrasePart::text("pm")],
            |d| json!(d[0]["value"].as_i64().map(|h| h + 12)))
        .add([phrasal::PhrasePart::value("hour", Integer::new()), phrasal::PhrasePart::text("am")],
            |d| d[0]["value"].clone())
        .add("noon", |_| json!(12))
        .build();

    let intents = IntentsBuilder::new(Arc::clone(&lang))
        .intent("orders:show", |r| {
            let dates = Enumeration::new(r.language(), &["today", "tomorrow", "yesterday"]);
            r.value("date", dates)
                .phrase("show orders")?
                .phrase("show orders for {date}")
        })?
        .intent("lights:set", |r| {
            r.value("level", Integer::new())
                .phrase("set lights to {level}")?
                .phrase("dim lights to {level}")
        })?
        .intent("alarm:set", |r| {
            r.value_graph("time", Arc::clone(&time))
                .phrase("wake me at {time}")?
                .phrase("set an alarm for {time}")
        })?
        .build();

    Ok(intents)
}
