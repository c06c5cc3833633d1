use std::path::Path;

use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;
use serde::Serialize;

use super::command::{Cli, InfoArgs, OutputFormat};
use crate::input::InputReader;
use crate::timestamp::time_str;
use mpegaudio::process::properties::{AudioProperties, PropertiesReader};
use mpegaudio::process::stream::MpegReader;
use mpegaudio::structs::vbri::VbriHeader;
use mpegaudio::structs::xing::{HeaderType, XingHeader};

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let mut reader = PropertiesReader::default();
    reader.set_read_style(args.read_style.into());

    // Configure fail level based on strict mode
    let fail_level = if cli.strict {
        Level::Warn
    } else {
        Level::Error
    };
    reader.set_fail_level(fail_level);

    let mut failed = 0;

    for input in &args.inputs {
        log::info!("Analyzing MPEG audio stream: {}", input.display());

        match analyze_input(input, &reader, multi) {
            Ok(props) => {
                let report = Report::new(input, &props);
                match args.format {
                    OutputFormat::Text => report.display(),
                    OutputFormat::Yaml => print!("---\n{}", serde_yaml_ng::to_string(&report)?),
                }
            }
            Err(e) => {
                if cli.strict {
                    return Err(e.context(format!("Failed to analyze {}", input.display())));
                }
                log::error!("Failed to analyze {}: {e:#}", input.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} inputs could not be analyzed", args.inputs.len());
    }

    Ok(())
}

fn analyze_input(
    input: &Path,
    reader: &PropertiesReader,
    multi: Option<&MultiProgress>,
) -> Result<AudioProperties> {
    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb.set_message(format!("Reading {}...", input.display()));
            Some(pb)
        }
        None => None,
    };

    let input_reader = InputReader::new(input)?;
    if input_reader.is_pipe() {
        log::debug!("Buffered stdin into memory");
    }

    let mut stream = MpegReader::new(input_reader)?;
    let result = reader.read(&mut stream);

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    result
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    path: String,
    version: String,
    layer: u8,
    channel_mode: String,
    channels: u8,
    sample_rate: u32,
    bitrate: u32,
    length_ms: u32,
    duration: String,
    protected: bool,
    copyrighted: bool,
    original: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    xing: Option<XingReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vbri: Option<VbriReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct XingReport {
    #[serde(rename = "type")]
    header_type: String,
    frames: u32,
    bytes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_padding: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_padding: Option<u16>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VbriReport {
    version: u16,
    quality: u16,
    frames: u32,
    bytes: u32,
}

impl Report {
    fn new(input: &Path, props: &AudioProperties) -> Self {
        let path = if InputReader::is_pipe_path(input) {
            "<stdin>".to_string()
        } else {
            input.display().to_string()
        };

        Self {
            path,
            version: props.version().to_string(),
            layer: props.layer(),
            channel_mode: props.channel_mode().to_string(),
            channels: props.channels(),
            sample_rate: props.sample_rate(),
            bitrate: props.bitrate(),
            length_ms: props.length_in_milliseconds(),
            duration: time_str(props.length_in_milliseconds()),
            protected: props.protection_enabled(),
            copyrighted: props.is_copyrighted(),
            original: props.is_original(),
            xing: props.xing_header().map(XingReport::new),
            vbri: props.vbri_header().map(VbriReport::new),
        }
    }

    fn display(&self) {
        println!();
        println!("MPEG Audio Stream Information");
        println!("=============================");
        println!();
        println!("File                        {}", self.path);
        println!();

        println!("Stream Information");
        println!(
            "  Format                    MPEG-{} Layer {}",
            self.version,
            layer_str(self.layer)
        );
        println!("  Channel mode              {}", self.channel_mode);
        println!("  Channels                  {}", self.channels);
        println!("  Sampling rate             {} Hz", self.sample_rate);
        println!("  Bitrate                   {} kbps", self.bitrate);
        println!("  Duration                  {}", self.duration);
        println!("  CRC protected             {}", self.protected);
        println!("  Copyrighted               {}", self.copyrighted);
        println!("  Original                  {}", self.original);
        println!();

        if let Some(xing) = &self.xing {
            println!("{} Header", xing.header_type);
            println!("  Frames                    {}", xing.frames);
            println!("  Size                      {} bytes", xing.bytes);
            if let Some(encoder) = &xing.encoder {
                println!("  Encoder                   {encoder}");
            }
            if let (Some(start), Some(end)) = (xing.start_padding, xing.end_padding) {
                println!("  Encoder delay             {start} samples");
                println!("  End padding               {end} samples");
            }
            println!();
        }

        if let Some(vbri) = &self.vbri {
            println!("VBRI Header");
            println!("  Version                   {}", vbri.version);
            println!("  Quality                   {}", vbri.quality);
            println!("  Frames                    {}", vbri.frames);
            println!("  Size                      {} bytes", vbri.bytes);
            println!();
        }
    }
}

impl XingReport {
    fn new(xing: &XingHeader) -> Self {
        let header_type = match xing.header_type {
            HeaderType::Xing => "Xing",
            HeaderType::Info => "Info",
        };

        Self {
            header_type: header_type.to_string(),
            frames: xing.total_frames,
            bytes: xing.total_size,
            encoder: xing.lame.as_ref().map(|lame| lame.encoder.clone()),
            start_padding: xing.lame.as_ref().map(|lame| lame.start_padding),
            end_padding: xing.lame.as_ref().map(|lame| lame.end_padding),
        }
    }
}

impl VbriReport {
    fn new(vbri: &VbriHeader) -> Self {
        Self {
            version: vbri.version,
            quality: vbri.quality,
            frames: vbri.total_frames,
            bytes: vbri.total_size,
        }
    }
}

fn layer_str(layer: u8) -> &'static str {
    match layer {
        1 => "I",
        2 => "II",
        3 => "III",
        _ => "unknown",
    }
}
