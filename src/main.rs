use clap::{Args, Parser, Subcommand};
use random_note_gen::midi::{LogSink, MidiDeviceManager, MidiSink, PortSelector};
use random_note_gen::sequencer::{self, CompletionReason};
use random_note_gen::settings::{self, SequenceSettings};
use ron::ser::PrettyConfig;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Debug, Parser)]
#[command(
    name = "random_note_gen",
    version,
    about = "Plays random in-scale notes to a MIDI output"
)]
struct Cli {
    /// Settings file (defaults to <config dir>/random_note_gen/settings.ron)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List MIDI output ports
    Ports,
    /// Play a sequence; flags override the stored defaults
    Play(PlayArgs),
    /// Show the stored defaults
    Defaults {
        /// Restore the built-in defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Output port index (see `ports`)
    #[arg(short, long)]
    port: Option<usize>,

    /// Output port name, instead of an index
    #[arg(long, conflicts_with = "port")]
    port_name: Option<String>,

    /// MIDI channel (1-16)
    #[arg(short, long)]
    channel: Option<u8>,

    /// Tempo in BPM
    #[arg(short, long)]
    bpm: Option<u32>,

    /// Number of bars to play
    #[arg(long)]
    bars: Option<u32>,

    /// Step subdivision (4 = quarter notes, 16 = sixteenths)
    #[arg(short, long)]
    note_value: Option<u32>,

    /// Octave range of the scale
    #[arg(short, long)]
    octave_range: Option<u8>,

    /// Gate modulation (0-100 %)
    #[arg(long)]
    gate_mod: Option<u8>,

    /// Micro-timing modulation (0-100 %)
    #[arg(long)]
    time_mod: Option<u8>,

    /// Root key (c, c#, d ... b; flats like eb accepted)
    #[arg(short, long)]
    key: Option<String>,

    /// Scale (maj, min, penta, whole, chrom)
    #[arg(short, long)]
    scale: Option<String>,

    /// Repeat the previous note instead of resting
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    every_step: Option<bool>,

    /// Quantise gate modulation to fixed fractions
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    quantise: Option<bool>,

    /// Send start + clock to an external recorder
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    external_clock: Option<bool>,

    /// Send a clock stop when the sequence ends
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    clock_stop: Option<bool>,

    /// RNG seed for a reproducible sequence
    #[arg(long)]
    seed: Option<u64>,

    /// Log messages instead of opening a MIDI port
    #[arg(long)]
    dry_run: bool,

    /// Store the resulting settings as the new defaults
    #[arg(long)]
    save_defaults: bool,
}

impl PlayArgs {
    fn apply(&self, settings: &mut SequenceSettings) {
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(channel) = self.channel {
            settings.channel = channel;
        }
        if let Some(bpm) = self.bpm {
            settings.bpm = bpm;
        }
        if let Some(bars) = self.bars {
            settings.bars = bars;
        }
        if let Some(note_value) = self.note_value {
            settings.note_value = note_value;
        }
        if let Some(octave_range) = self.octave_range {
            settings.octave_range = octave_range;
        }
        if let Some(gate_mod) = self.gate_mod {
            settings.gate_mod = gate_mod;
        }
        if let Some(time_mod) = self.time_mod {
            settings.time_mod = time_mod;
        }
        if let Some(key) = &self.key {
            settings.key = key.clone();
        }
        if let Some(scale) = &self.scale {
            settings.scale = scale.clone();
        }
        if let Some(every_step) = self.every_step {
            settings.every_step = every_step;
        }
        if let Some(quantise) = self.quantise {
            settings.quantise = quantise;
        }
        if let Some(external_clock) = self.external_clock {
            settings.start_external_clock = external_clock;
        }
        if let Some(clock_stop) = self.clock_stop {
            settings.send_clock_stop = clock_stop;
        }
    }

    fn port_selector(&self, settings: &SequenceSettings) -> PortSelector {
        match &self.port_name {
            Some(name) => PortSelector::Name(name.clone()),
            None => PortSelector::Index(settings.port),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings_path = cli.config.clone().or_else(settings::default_path);

    match cli.command {
        Command::Ports => list_ports(),
        Command::Play(args) => play(&args, settings_path.as_deref()),
        Command::Defaults { reset } => show_defaults(reset, settings_path.as_deref()),
    }
}

fn list_ports() -> Result<(), Box<dyn Error>> {
    let ports = MidiDeviceManager::new().list_output_ports();

    if ports.is_empty() {
        println!("No MIDI output ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

fn load_settings(path: Option<&Path>) -> SequenceSettings {
    path.map(SequenceSettings::load_or_default)
        .unwrap_or_default()
}

fn settings_path_or_err(path: Option<&Path>) -> Result<&Path, Box<dyn Error>> {
    path.ok_or_else(|| "no config directory available, pass --config".into())
}

fn play(args: &PlayArgs, path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut settings = load_settings(path);
    args.apply(&mut settings);

    let (params, scale) = settings.assemble()?;
    let params = params.with_seed(args.seed);

    if args.save_defaults {
        settings.save(settings_path_or_err(path)?)?;
    }

    let sink: Box<dyn MidiSink> = if args.dry_run {
        Box::new(LogSink::new())
    } else {
        Box::new(MidiDeviceManager::new().open(&args.port_selector(&settings))?)
    };

    println!(
        "Playing {} bars of 1/{} notes at {} BPM in {} {}. Press Enter to stop.",
        params.bars,
        params.note_value,
        params.bpm,
        settings.key.to_uppercase(),
        settings.scale
    );

    let handle = sequencer::start(params, scale, sink)?;

    let switch = handle.switch();
    thread::spawn(move || {
        let mut line = String::new();
        // EOF on a closed stdin is not a stop request
        if matches!(io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            switch.stop();
        }
    });

    match handle.wait()? {
        CompletionReason::EndOfPattern => println!("End of pattern"),
        CompletionReason::Cancelled => println!("Sequence ended by user"),
    }
    Ok(())
}

fn show_defaults(reset: bool, path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let settings = if reset {
        let settings = SequenceSettings::default();
        settings.save(settings_path_or_err(path)?)?;
        settings
    } else {
        load_settings(path)
    };

    if let Some(path) = path {
        println!("# {}", path.display());
    }
    println!(
        "{}",
        ron::ser::to_string_pretty(&settings, PrettyConfig::default())?
    );
    Ok(())
}
