//! Property-based tests: chunking, interleaved noise, and the sentinel never
//! change the assembled text.

use bytes::Bytes;
use parley_stream::{ChunkReader, assemble};
use parley_types::{Message, Transcript, TranscriptSink, TurnOutcome};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

fn data_line(token: &str) -> String {
    let payload = serde_json::json!({ "choices": [{ "delta": { "content": token } }] });
    format!("data: {payload}\n")
}

fn arb_token() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 .,!?]{1,8}",
        Just("é".to_string()),
        Just("日本".to_string()),
        Just("🦀".to_string()),
        Just("\n".to_string()),
        Just("\"quoted\"".to_string()),
    ]
}

fn noise_line() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(": ping\n"),
        Just(":\r\n"),
        Just("\n"),
        Just("\r\n"),
        Just("event: x\n"),
        Just("data:no-space\n"),
    ]
}

/// Cut `body` at arbitrary byte offsets, ignoring char boundaries.
fn partition(body: &[u8], cuts: &[usize]) -> Vec<Bytes> {
    let mut offsets: Vec<usize> = cuts.iter().map(|c| c % (body.len() + 1)).collect();
    offsets.sort_unstable();
    offsets.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for end in offsets.into_iter().chain(std::iter::once(body.len())) {
        chunks.push(Bytes::copy_from_slice(&body[start..end]));
        start = end;
    }
    chunks
}

fn run(chunks: Vec<Bytes>) -> (TurnOutcome, Transcript) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let mut transcript = Transcript::new();
        transcript.append_user_turn("q");
        transcript.begin_assistant_turn();

        let body = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
        let reader = ChunkReader::new(body, CancellationToken::new());
        let outcome = assemble(reader, &mut transcript).await;
        (outcome, transcript)
    })
}

fn assembled(transcript: &Transcript) -> String {
    transcript.last().map(|m| m.content).unwrap_or_default()
}

proptest! {
    #[test]
    fn any_chunking_matches_single_chunk(
        tokens in proptest::collection::vec(arb_token(), 0..24),
        cuts in proptest::collection::vec(any::<usize>(), 0..32),
    ) {
        let body: String = tokens.iter().map(|t| data_line(t)).collect::<String>() + "data: [DONE]\n";
        let expected: String = tokens.concat();

        let (_, whole) = run(vec![Bytes::from(body.clone())]);
        let (outcome, split) = run(partition(body.as_bytes(), &cuts));

        prop_assert_eq!(outcome, TurnOutcome::Completed);
        prop_assert_eq!(assembled(&whole), expected.clone());
        prop_assert_eq!(assembled(&split), expected);
        prop_assert_eq!(split.len(), 2);
    }

    #[test]
    fn comments_and_blank_lines_do_not_change_text(
        tokens in proptest::collection::vec(arb_token(), 1..16),
        noise in proptest::collection::vec(proptest::collection::vec(noise_line(), 0..3), 17),
        cuts in proptest::collection::vec(any::<usize>(), 0..32),
    ) {
        let plain: String = tokens.iter().map(|t| data_line(t)).collect::<String>() + "data: [DONE]\n";

        // One noise slot before every data line, plus one between the last
        // data line and the sentinel.
        let mut noisy = String::new();
        for (token, slot) in tokens.iter().zip(&noise) {
            noisy.extend(slot.iter().copied());
            noisy.push_str(&data_line(token));
        }
        noisy.extend(noise[tokens.len()].iter().copied());
        noisy.push_str("data: [DONE]\n");

        let (_, a) = run(vec![Bytes::from(plain)]);
        let (outcome, b) = run(partition(noisy.as_bytes(), &cuts));
        prop_assert_eq!(outcome, TurnOutcome::Completed);
        prop_assert_eq!(assembled(&a), tokens.concat());
        prop_assert_eq!(assembled(&b), assembled(&a));
        prop_assert_eq!(b.len(), 2);
    }

    #[test]
    fn nothing_after_done_is_applied(
        before in proptest::collection::vec(arb_token(), 0..8),
        after in proptest::collection::vec(arb_token(), 1..8),
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
    ) {
        let body: String = before.iter().map(|t| data_line(t)).collect::<String>()
            + "data: [DONE]\n"
            + &after.iter().map(|t| data_line(t)).collect::<String>();

        let (outcome, transcript) = run(partition(body.as_bytes(), &cuts));
        prop_assert_eq!(outcome, TurnOutcome::Completed);
        prop_assert_eq!(assembled(&transcript), before.concat());
    }
}

#[test]
fn one_byte_chunks_of_a_long_answer() {
    let tokens: Vec<String> = (0..200).map(|i| format!("t{i} ")).collect();
    let body: String = tokens.iter().map(|t| data_line(t)).collect::<String>() + "data: [DONE]\n";
    let chunks = body.bytes().map(|b| Bytes::copy_from_slice(&[b])).collect();

    let (outcome, transcript) = run(chunks);
    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(transcript.last(), Some(Message::assistant(tokens.concat())));
    assert!(!transcript.is_streaming());
}
