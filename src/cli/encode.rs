use std::fs;

use huffmania::{Codec, FrequencyTable, if_tracing};

use crate::cli::{EncodeArgs, Result, save_frequencies, sidecar_path};

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(input = %args.input.display())))]
pub fn encode(args: EncodeArgs) -> Result<()> {
    let config = args.config.resolve()?;
    let input_data = fs::read(&args.input)?;

    let mut frequencies = FrequencyTable::new(config.vocab_size);
    frequencies.accumulate(&input_data)?;
    let codec = Codec::build(&config, &frequencies)?;

    let mut stream = codec.new_stream();
    codec.encode(&input_data, &mut stream)?;
    let payload = stream.to_payload();
    fs::write(&args.output, &payload)?;

    let sidecar = match args.frequencies {
        Some(path) => path,
        None => sidecar_path(&args.output)?,
    };
    save_frequencies(&frequencies, &sidecar)?;

    if_tracing! {
        tracing::info!(
            event = "encode_complete",
            output = %args.output.display(),
            frequencies = %sidecar.display(),
            bits = stream.len(),
            compressed_len = payload.len(),
            "encode finished"
        );
    }
    eprintln!(
        "encoded {} bytes into {} bits ({} bytes), frequencies saved to {}",
        input_data.len(),
        stream.len(),
        payload.len(),
        sidecar.display()
    );
    Ok(())
}
