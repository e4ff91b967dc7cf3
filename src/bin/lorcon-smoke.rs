//! LORCON2 smoke test (lorcon-smoke)
//!
//! Exercises the bindings end to end against one wireless interface:
//! library queries first, then a series of short-lived contexts.
//!
//! # Usage
//!
//! ```bash
//! # Run against real hardware (requires root and liborcon2)
//! sudo lorcon-smoke wlan0mon
//!
//! # Dry run against the simulated driver
//! lorcon-smoke --simulate wlan0mon
//! ```

use anyhow::{Context as _, Result};
use clap::Parser;
use liblorcon2::{
    auto_driver, find_driver, library_version, list_drivers, Context, LorconBackend, LorconConfig,
    SimulatedLorcon,
};
use serde::Serialize;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Beacon with BSSID 00:21:21:21:21:21, SSID "XXXX", channel 1
const BEACON: [u8; 61] = [
    0x80, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x21, 0x21, 0x21, 0x21,
    0x21, 0x00, 0x21, 0x21, 0x21, 0x21, 0x21, 0x90, 0x83, 0x50, 0x8c, 0xf4, 0x38, 0x23, 0x00,
    0x00, 0x00, 0x64, 0x00, 0x11, 0x04, 0x00, 0x04, 0x58, 0x58, 0x58, 0x58, 0x01, 0x08, 0x82,
    0x84, 0x8b, 0x96, 0x24, 0x30, 0x48, 0x6c, 0x03, 0x01, 0x01, 0x32, 0x04, 0x0c, 0x12, 0x18,
    0x60,
];

/// LORCON2 bindings smoke test
#[derive(Parser, Debug)]
#[command(name = "lorcon-smoke")]
#[command(author = "lorcon2-rs contributors")]
#[command(version)]
#[command(about = "Smoke test for the LORCON2 bindings against one wireless interface", long_about = None)]
struct Args {
    /// Wireless interface to test
    interface: String,

    /// Driver used for the lookup test
    #[arg(long, default_value = "mac80211")]
    driver: String,

    /// Channel used for the channel test
    #[arg(long, default_value_t = 1)]
    channel: i32,

    /// Timeout (ms) used for the timeout test
    #[arg(long, default_value_t = 123)]
    timeout: i64,

    /// VAP name used for the VAP test
    #[arg(long, default_value = "wlan0")]
    vap: String,

    /// Use the simulated driver instead of liborcon2
    #[arg(long)]
    simulate: bool,

    /// Path to liborcon2 (overrides the configured search paths)
    #[arg(long)]
    library: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print query results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Collects pass/fail results
struct Report {
    json: bool,
    failures: usize,
}

impl Report {
    fn query<T: Serialize + Debug>(&mut self, name: &str, params: &[&str], result: liblorcon2::LorconResult<T>) {
        println!(" * {}", name);
        println!("  - [Parameters  ]: {:?}", params);
        match result {
            Ok(value) => {
                println!("  - [Return Type ]: {}", short_type_name::<T>());
                if self.json {
                    match serde_json::to_string(&value) {
                        Ok(json) => println!("  - [Return Value]: {}", json),
                        Err(_) => println!("  - [Return Value]: {:?}", value),
                    }
                } else {
                    println!("  - [Return Value]: {:?}", value);
                }
            }
            Err(e) => {
                println!("  - [Error       ]: {}", e);
                self.failures += 1;
            }
        }
    }

    fn check(&mut self, name: &str, result: Result<String>) {
        match result {
            Ok(detail) if detail.is_empty() => println!(" * {} OK", name),
            Ok(detail) => println!(" * {} OK: {}", name, detail),
            Err(e) => {
                println!(" * {} FAILED: {:#}", name, e);
                self.failures += 1;
            }
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = match &args.config {
        Some(path) => LorconConfig::load(path)?,
        None => LorconConfig::default(),
    };

    let backend = load_backend(&args, &config)?;
    let mut report = Report {
        json: args.json,
        failures: 0,
    };

    println!("\n== Module Tests ==");
    module_tests(&mut report, backend.as_ref(), &args);

    println!("\n== Lorcon Context Tests ==");
    context_tests(&mut report, &backend, &config, &args);

    if report.failures > 0 {
        println!("\n{} test(s) failed", report.failures);
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(args: &Args) {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            EnvFilter::new(format!("lorcon_smoke={},liblorcon2={}", log_level, log_level))
        });

    // stdout carries the test report
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

fn load_backend(args: &Args, config: &LorconConfig) -> Result<Arc<dyn LorconBackend>> {
    if args.simulate {
        debug!("Using simulated driver for {}", args.interface);
        return Ok(Arc::new(SimulatedLorcon::mac80211(args.interface.as_str())));
    }

    #[cfg(target_os = "linux")]
    {
        let uid = unsafe { libc::getuid() };
        if uid != 0 {
            warn!("Not running as root - opening the interface will likely fail");
        }
    }

    #[cfg(feature = "native")]
    {
        let library = match &args.library {
            Some(path) => unsafe { liblorcon2::LorconLibrary::open(path) },
            None => unsafe { liblorcon2::LorconLibrary::load(config) },
        }
        .context("Failed to load liborcon2")?;
        debug!("Using liborcon2 from {}", library.path().display());
        Ok(Arc::new(library))
    }

    #[cfg(not(feature = "native"))]
    {
        let _ = config;
        anyhow::bail!("built without the `native` feature; rerun with --simulate")
    }
}

fn module_tests(report: &mut Report, backend: &dyn LorconBackend, args: &Args) {
    report.query("get_version()", &[], Ok(library_version(backend)));
    report.query("list_drivers()", &[], Ok(list_drivers(backend)));
    report.query("find_driver()", &[args.driver.as_str()], find_driver(backend, &args.driver));
    report.query("auto_driver()", &[args.interface.as_str()], auto_driver(backend, &args.interface));
}

fn context_tests(report: &mut Report, backend: &Arc<dyn LorconBackend>, config: &LorconConfig, args: &Args) {
    let new_context = || -> Result<Context> {
        Ok(Context::builder(Arc::clone(backend), args.interface.as_str())
            .config(config)
            .build()?)
    };

    report.check("Injection Test", (|| -> Result<String> {
        let mut ctx = new_context()?;
        ctx.open_injection_monitor()?;
        let sent = ctx.send_bytes(&BEACON)?;
        Ok(format!("PASSED, {} of {} bytes sent (sniff to check!)", sent, BEACON.len()))
    })());

    report.check("Timeout Test", (|| -> Result<String> {
        let mut ctx = new_context()?;
        ctx.set_timeout(args.timeout)?;
        match ctx.timeout()? {
            Some(t) if t == args.timeout => Ok(String::new()),
            other => anyhow::bail!("expected {}, got {:?}", args.timeout, other),
        }
    })());

    report.check("Vap Test", (|| -> Result<String> {
        let mut ctx = new_context()?;
        ctx.open_monitor()?;
        ctx.set_virtual_access_point(&args.vap)?;
        match ctx.virtual_access_point() {
            Some(v) if v == args.vap => Ok(String::new()),
            other => anyhow::bail!("expected {}, got {:?}", args.vap, other),
        }
    })());

    report.check("Get Driver Name Test", (|| -> Result<String> {
        let mut ctx = new_context()?;
        ctx.open_monitor()?;
        Ok(ctx.driver_name()?)
    })());

    report.check("Set Channel Test", (|| -> Result<String> {
        let mut ctx = new_context()?;
        ctx.open_monitor()?;
        ctx.set_channel(args.channel)?;
        let channel = ctx.channel()?;
        if channel != args.channel {
            anyhow::bail!("expected {}, got {}", args.channel, channel);
        }
        Ok(String::new())
    })());

    report.check("Hardware Address Test", (|| -> Result<String> {
        let mut ctx = new_context()?;
        ctx.open_monitor()?;
        Ok(ctx.hardware_address()?.to_string())
    })());
}
