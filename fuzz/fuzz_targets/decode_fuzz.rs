//! Decode fuzz target: the first byte picks an offset, the rest is the buffer.
//! Every data type is decoded there; decoding must fail cleanly, never panic.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
use s7layout::DataType;

#[cfg(fuzzing)]
const TYPES: &[DataType] = &[
    DataType::Bool,
    DataType::Byte,
    DataType::Char,
    DataType::WChar,
    DataType::Int8,
    DataType::UInt8,
    DataType::Int16,
    DataType::UInt16,
    DataType::Int32,
    DataType::UInt32,
    DataType::Real32,
    DataType::Real64,
    DataType::String(254),
    DataType::WString(254),
    DataType::FString(8),
    DataType::FixedBytes(8),
    DataType::S5Time,
    DataType::Time,
    DataType::Date,
    DataType::TimeOfDay,
    DataType::DateAndTime,
    DataType::DateTimeLong,
];

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Some((&first, buf)) = data.split_first() else {
        return;
    };
    let offset = (first >> 3) as usize;
    let bit = first & 7;
    for &dt in TYPES {
        let bit = (dt == DataType::Bool).then_some(bit);
        if let Ok(v) = s7layout::codec::decode(buf, offset, bit, dt) {
            let mut copy = buf.to_vec();
            let _ = s7layout::codec::encode(&mut copy, offset, bit, dt, &v);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
