use std::fs;

use serde::Serialize;

use huffmania::{Codec, CodeRef, DerivationSummary, FrequencyTable, Token};

use crate::cli::{DumpArgs, Result};

#[derive(Serialize, Debug)]
struct TokenReport {
    token: Token,
    count: u64,
    #[serde(flatten)]
    code: CodeRef,
    bits: String,
}

#[derive(Serialize, Debug)]
struct DumpReport {
    input_len: usize,
    distinct: usize,
    max_code_len: usize,
    #[serde(flatten)]
    summary: DerivationSummary,
    tokens: Vec<TokenReport>,
}

fn build_report(frequencies: &FrequencyTable, codec: &Codec, input_len: usize) -> DumpReport {
    let table = codec.table();
    let tokens = table
        .entries()
        .map(|(token, code)| TokenReport {
            token,
            count: frequencies.get(token),
            code,
            bits: table.code_string(token).unwrap_or_default(),
        })
        .collect();

    DumpReport {
        input_len,
        distinct: frequencies.distinct(),
        max_code_len: table.max_length(),
        summary: table.summary(),
        tokens,
    }
}

pub fn dump(args: DumpArgs) -> Result<()> {
    let config = args.config.resolve()?;
    let input = fs::read(&args.input)?;

    let mut frequencies = FrequencyTable::new(config.vocab_size);
    frequencies.accumulate(&input)?;
    let codec = Codec::build(&config, &frequencies)?;
    let report = build_report(&frequencies, &codec, input.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for token in &report.tokens {
        println!("Frequency for {} is {}", token.token, token.count);
    }
    println!("Total bitcount of all codes: {} bits", report.summary.code_bits);
    for token in &report.tokens {
        println!("Token: {} -> {}", token.token, token.bits);
    }
    println!("Original stream size: {} bytes", report.input_len);
    println!(
        "Encoded stream size: {} bits, {} bytes",
        report.summary.weighted_bits,
        report.summary.weighted_bits.div_ceil(8)
    );
    Ok(())
}
