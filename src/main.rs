use anyhow::Result;
use batch_pool::{
    current_worker,
    model::Verdict,
    workload::{self, async_sleep, blocking_sleep, cpu_intensive},
    Capabilities, Config, LocalScheduler, ThreadPool,
};
use clap::{Args, Parser, Subcommand};
use std::{thread, time::Duration};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};


#[derive(Parser, Debug)]
#[command(author, version, about = "Runs batches of work units on a bounded pool or a cooperative scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show detected execution capabilities
    Info,
    /// Compute-bound units: sequential vs pool
    Cpu(CpuArgs),
    /// Units blocking on a timed wait: sequential vs pool
    Io(WaitArgs),
    /// Units awaiting a timer on the single-threaded scheduler
    Coop(WaitArgs),
    /// Show which worker thread runs each unit
    Threads {
        #[arg(long, default_value_t = 3)]
        workers: usize,
    },
    /// Run every demonstration in order
    All,
}

#[derive(Args, Debug, Clone)]
struct CpuArgs {
    #[arg(long, default_value_t = 10_000_000)]
    iterations: u64,
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

impl Default for CpuArgs {
    fn default() -> Self {
        Self {
            iterations: 10_000_000,
            workers: 4,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct WaitArgs {
    #[arg(long, default_value_t = 4)]
    tasks: usize,
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,
    /// Pool size (io) or in-flight limit (coop); defaults to the number of tasks
    #[arg(long)]
    workers: Option<usize>,
}

impl Default for WaitArgs {
    fn default() -> Self {
        Self {
            tasks: 4,
            delay_ms: 500,
            workers: None,
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

fn show_info(caps: &Capabilities) {
    header("Execution capabilities");
    println!("Logical cores:  {}", caps.logical_cores);
    println!("Physical cores: {}", caps.physical_cores);
    println!("Model:          {:?}", caps.model);
    println!("Expectation:    {}", workload::expectation(caps, 4));
}

fn demo_cpu(caps: &Capabilities, args: &CpuArgs) -> Result<()> {
    header("Compute-bound units");
    let pool = ThreadPool::new(args.workers)?;
    let n = args.iterations;

    let cmp = workload::compare(
        args.workers,
        || {
            for _ in 0..args.workers {
                std::hint::black_box(cpu_intensive(n));
            }
        },
        || {
            let units = (0..args.workers)
                .map(|_| (|n: u64| -> anyhow::Result<u64> { Ok(std::hint::black_box(cpu_intensive(n))) }, n));
            // Ошибки тут невозможны, но не глотаем их молча
            match pool.run(units) {
                Ok(results) => {
                    for (index, result) in results.into_iter().enumerate() {
                        if let Err(err) = result {
                            tracing::error!(unit = index, %err, "compute unit failed");
                        }
                    }
                }
                Err(err) => tracing::error!(%err, "compute batch failed"),
            }
        },
    );

    println!("Sequential:  {:.3}s", cmp.sequential.as_secs_f64());
    println!("Pool of {}:   {:.3}s", args.workers, cmp.concurrent.as_secs_f64());
    println!("Speedup:     {:.2}x", cmp.speedup());
    match cmp.verdict(caps) {
        Verdict::Parallel => println!("Units ran in true parallel across cores"),
        Verdict::Serialized => println!("No speedup: units were serialized"),
        Verdict::Partial => println!("Some speedup (scheduling overhead varies)"),
    }
    pool.shutdown();
    Ok(())
}

fn sleep_sequentially(tasks: usize, delay: Duration) -> Result<usize> {
    for id in 0..tasks {
        blocking_sleep(id, delay)?;
    }
    Ok(tasks)
}

fn demo_io(args: &WaitArgs) -> Result<()> {
    header("Units blocking on a timed wait");
    let delay = Duration::from_millis(args.delay_ms);
    let workers = args.workers.unwrap_or(args.tasks).max(1);
    let pool = ThreadPool::new(workers)?;

    let (slept, sequential) = workload::measure(|| sleep_sequentially(args.tasks, delay));
    slept?;
    println!("Sequential:  {:.3}s", sequential.as_secs_f64());

    let units = (0..args.tasks).map(|id| {
        (
            move |id: usize| -> anyhow::Result<usize> {
                println!(
                    "  unit {id} started on {}",
                    thread::current().name().unwrap_or("<unnamed>")
                );
                let done = blocking_sleep(id, delay)?;
                println!("  unit {id} completed");
                Ok(done)
            },
            id,
        )
    });
    let (ids, concurrent) = workload::measure(|| pool.run_values(units));
    println!("Pool of {workers}:   {:.3}s -> {:?}", concurrent.as_secs_f64(), ids?);
    pool.shutdown();
    Ok(())
}

fn demo_coop(args: &WaitArgs) -> Result<()> {
    header("Cooperative units on one thread");
    let delay = Duration::from_millis(args.delay_ms);
    let scheduler = match args.workers {
        Some(limit) => LocalScheduler::with_limit(limit)?,
        None => LocalScheduler::new(),
    };

    let units = (0..args.tasks).map(|id| {
        (
            move |id: usize| async move {
                println!("  async unit {id} started");
                let done = async_sleep(id, delay).await?;
                println!("  async unit {id} completed");
                Ok::<_, anyhow::Error>(done)
            },
            id,
        )
    });
    let (ids, elapsed) = workload::measure(|| scheduler.run_values(units));
    println!("Total:       {:.3}s -> {:?}", elapsed.as_secs_f64(), ids?);
    Ok(())
}

fn demo_threads(workers: usize) -> Result<()> {
    header("Worker threads are real OS threads");
    let pool = ThreadPool::new(workers)?;
    let units = (0..workers).map(|id| {
        (
            |id: usize| -> anyhow::Result<String> {
                let current = thread::current();
                let line = format!(
                    "  unit {id} | worker {:?} | thread '{}' | id {:?}",
                    current_worker(),
                    current.name().unwrap_or("<unnamed>"),
                    current.id()
                );
                // Держим поток, чтобы задачи разошлись по разным воркерам
                thread::sleep(Duration::from_millis(100));
                Ok(line)
            },
            id,
        )
    });
    for line in pool.run_values(units)? {
        println!("{line}");
    }
    pool.shutdown();
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let caps = Capabilities::detect();
    tracing::debug!(config = ?Config::for_capabilities(&caps), "default pool config");

    match cli.command.unwrap_or(Command::All) {
        Command::Info => show_info(&caps),
        Command::Cpu(args) => demo_cpu(&caps, &args)?,
        Command::Io(args) => demo_io(&args)?,
        Command::Coop(args) => demo_coop(&args)?,
        Command::Threads { workers } => demo_threads(workers)?,
        Command::All => {
            show_info(&caps);
            demo_cpu(&caps, &CpuArgs::default())?;
            demo_io(&WaitArgs::default())?;
            demo_coop(&WaitArgs::default())?;
            demo_threads(3)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_sleeps_add_up() {
        let delay = Duration::from_millis(5);
        let (slept, elapsed) = workload::measure(|| sleep_sequentially(4, delay));
        assert_eq!(slept.unwrap(), 4);
        assert!(elapsed >= delay * 4);
    }
}
