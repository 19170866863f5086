use std::fs;

use huffmania::{BitStream, Codec, if_tracing};

use crate::cli::{DecodeArgs, Result, load_frequencies, sidecar_path};

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(input = %args.input.display())))]
pub fn decode(args: DecodeArgs) -> Result<()> {
    let config = args.config.resolve()?;
    let sidecar = match args.frequencies {
        Some(path) => path,
        None => sidecar_path(&args.input)?,
    };
    let frequencies = load_frequencies(&sidecar)?;
    let codec = Codec::build(&config, &frequencies)?;

    let compressed_data = fs::read(&args.input)?;
    let mut stream = BitStream::from_payload(&compressed_data)?;
    let decompressed_data = codec.decode(&mut stream)?;

    if_tracing! {
        tracing::info!(
            event = "decode_complete",
            output = %args.output.display(),
            bits = stream.len(),
            decompressed_len = decompressed_data.len(),
            "decode finished"
        );
    }
    fs::write(&args.output, decompressed_data)?;
    Ok(())
}
