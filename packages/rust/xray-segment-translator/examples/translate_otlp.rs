use std::env;
use std::fs;
use std::io::{self, Read};
use xray_segment_translator::{SegmentTranslator, TranslatorConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Read a protobuf ExportTraceServiceRequest from a file argument or stdin
    let payload = if let Some(file_path) = env::args().nth(1) {
        fs::read(file_path)?
    } else {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        buffer
    };

    // Indexing is driven by XRAY_SEGMENT_* environment variables
    let translator = SegmentTranslator::new(TranslatorConfig::from_env());
    let batch = translator.translate_otlp_protobuf(&payload)?;

    // One segment document per line, ready for PutTraceSegments
    for document in &batch.documents {
        println!("{}", document);
    }
    if batch.rejected > 0 {
        eprintln!("{} span(s) could not be translated", batch.rejected);
    }

    Ok(())
}
