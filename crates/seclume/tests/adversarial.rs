//! Adversarial tests: wrong passwords, bit flips in every region, crafted
//! hostile archives, and the legacy-version rule. These validate the
//! guarantees the format makes about tamper evidence and traversal safety.

use std::{fs, io::BufReader, path::Path};

use rand::rngs::OsRng;
use seclume::{
	codec::{self, Compression},
	crypto,
	decode::Decoder,
	encode::{Encoder, PackOptions},
	error::Error,
	extract::{extract_archive, ExtractOptions},
	format::{
		entry::{FileEntryPlain, ENTRY_SIZE},
		header::{ArchiveHeader, HEADER_SIZE},
	},
	keys::KeySchedule,
	list::list_archive,
	NONCE_SIZE, SALT_SIZE, TAG_SIZE,
};

const PASSWORD: &str = "Pw#Aaaa1!";

fn pack_archive(archive: &Path, entries: &[(&str, u32, &[u8])]) {
	let mut file = fs::File::create(archive).unwrap();
	let mut csprng = OsRng;
	let mut encoder = Encoder::new(
		&mut file,
		&mut csprng,
		PASSWORD,
		entries.len() as u32,
		&PackOptions::default(),
	)
	.unwrap();
	for (name, mode, data) in entries {
		encoder.add_entry(name, *mode, data).unwrap();
	}
	encoder.finish().unwrap();
}

fn flip_byte(archive: &Path, offset: usize) {
	let mut bytes = fs::read(archive).unwrap();
	bytes[offset] ^= 0x01;
	fs::write(archive, bytes).unwrap();
}

fn extract_into(archive: &Path, password: &str, outdir: &Path) -> Result<u32, Error> {
	extract_archive(
		archive,
		password,
		&ExtractOptions {
			outdir: Some(outdir.to_path_buf()),
			overwrite: false,
		},
	)
	.map(|summary| summary.files)
}

fn assert_empty_dir(dir: &Path) {
	assert!(
		fs::read_dir(dir).unwrap().next().is_none(),
		"nothing may be created in {dir:?}"
	);
}

// ── Wrong password ──

#[test]
fn wrong_password_fails_before_any_output() {
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("pw.slm");
	pack_archive(&archive, &[("secret.txt", 0o600, b"classified")]);

	let out = dir.path().join("out");
	fs::create_dir(&out).unwrap();
	let err = extract_into(&archive, "Pw#Aaaa2!", &out).unwrap_err();
	assert!(matches!(err, Error::HeaderAuth), "got {err:?}");
	assert_empty_dir(&out);
}

// ── Header tampering ──

#[test]
fn header_bit_flips_never_pass_silently() {
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("hdr.slm");
	pack_archive(&archive, &[("a.txt", 0o644, b"payload")]);
	let pristine = fs::read(&archive).unwrap();

	// one offset in every header field: magic, version, algo, level,
	// file_count, comment_len, salt, comment region, outdir region, hmac
	for offset in [0usize, 4, 5, 6, 8, 12, 21, 40, 600, 870] {
		fs::write(&archive, &pristine).unwrap();
		flip_byte(&archive, offset);

		let out = dir.path().join(format!("out-{offset}"));
		fs::create_dir(&out).unwrap();
		let err = extract_into(&archive, PASSWORD, &out).unwrap_err();
		assert!(
			matches!(
				err,
				Error::HeaderAuth
					| Error::BadMagic | Error::UnsupportedVersion(_)
					| Error::BadCompressionAlgo(_)
					| Error::MalformedHeader { .. }
			),
			"offset {offset}: got {err:?}"
		);
		assert_empty_dir(&out);
	}
}

#[test]
fn truncated_header_is_its_own_error() {
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("short.slm");
	pack_archive(&archive, &[]);

	let bytes = fs::read(&archive).unwrap();
	fs::write(&archive, &bytes[..HEADER_SIZE / 2]).unwrap();
	let err = list_archive(&archive, PASSWORD).unwrap_err();
	assert!(matches!(err, Error::TruncatedHeader), "got {err:?}");
}

// ── Entry and payload tampering ──

#[test]
fn entry_metadata_tamper_is_detected() {
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("meta.slm");
	pack_archive(&archive, &[("a.txt", 0o644, b"payload")]);

	// inside the first entry's sealed metadata
	flip_byte(&archive, HEADER_SIZE + NONCE_SIZE + TAG_SIZE + 4);

	let out = dir.path().join("out");
	fs::create_dir(&out).unwrap();
	let err = extract_into(&archive, PASSWORD, &out).unwrap_err();
	assert!(matches!(err, Error::EntryAuth { index: 0 }), "got {err:?}");
	assert_empty_dir(&out);
}

#[test]
fn payload_tamper_is_detected_before_the_file_appears() {
	let kib: Vec<u8> = (0..1024u32).map(|i| (i * 7 % 256) as u8).collect();
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("payload.slm");
	pack_archive(&archive, &[("blob.bin", 0o644, &kib)]);

	// past the payload frame's nonce and tag, into the ciphertext
	flip_byte(&archive, HEADER_SIZE + ENTRY_SIZE + NONCE_SIZE + TAG_SIZE + 10);

	let out = dir.path().join("out");
	fs::create_dir(&out).unwrap();
	let err = extract_into(&archive, PASSWORD, &out).unwrap_err();
	assert!(matches!(err, Error::PayloadAuth { index: 0 }), "got {err:?}");
	assert_empty_dir(&out);
}

#[test]
fn truncated_payload_is_detected() {
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("cut.slm");
	pack_archive(&archive, &[("a.txt", 0o644, b"some payload data")]);

	let bytes = fs::read(&archive).unwrap();
	fs::write(&archive, &bytes[..bytes.len() - 4]).unwrap();

	let out = dir.path().join("out");
	fs::create_dir(&out).unwrap();
	let err = extract_into(&archive, PASSWORD, &out).unwrap_err();
	assert!(matches!(err, Error::TruncatedEntry { index: 0 }), "got {err:?}");
	assert_empty_dir(&out);
}

// ── Crafted archives ──

/// Build an archive byte-by-byte from sealed parts, bypassing the encoder's
/// own validation. `entries` pairs a 280-byte plaintext record with the raw
/// bytes to append after it.
fn craft_archive(
	password: &str,
	version: u8,
	algo_byte: u8,
	entries: &[([u8; 280], Vec<u8>)],
) -> (Vec<u8>, KeySchedule) {
	let salt = [0x5Au8; SALT_SIZE];
	let keys = KeySchedule::derive(password, &salt);

	let mut header = ArchiveHeader::new(Compression::Lzma, 1, entries.len() as u32);
	header.version = version;
	header.algo = algo_byte;
	header.salt = salt;
	header.hmac = header.compute_hmac(&keys.file);

	let mut bytes = header.to_bytes().to_vec();
	for (plain, tail) in entries {
		let mut nonce = [0u8; NONCE_SIZE];
		crypto::fill_random(&mut OsRng, &mut nonce).unwrap();
		let (ciphertext, tag) = crypto::aead_seal(&keys.meta, &nonce, plain).unwrap();
		bytes.extend_from_slice(&nonce);
		bytes.extend_from_slice(&tag);
		bytes.extend_from_slice(&ciphertext);
		bytes.extend_from_slice(tail);
	}
	(bytes, keys)
}

fn plain_record(name: &[u8], compressed: u64, original: u64) -> [u8; 280] {
	let mut bytes = FileEntryPlain::new("placeholder", compressed, original, 0o644)
		.unwrap()
		.to_bytes();
	bytes[..256].fill(0);
	bytes[..name.len()].copy_from_slice(name);
	bytes
}

#[test]
fn traversing_filename_never_escapes() {
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("evil.slm");
	let (bytes, _keys) = craft_archive(
		PASSWORD,
		6,
		Compression::Lzma.as_u8(),
		&[(plain_record(b"../evil", 0, 0), Vec::new())],
	);
	fs::write(&archive, bytes).unwrap();

	let out = dir.path().join("out");
	fs::create_dir(&out).unwrap();
	let err = extract_into(&archive, PASSWORD, &out).unwrap_err();
	assert!(matches!(err, Error::PathTraversal { .. }), "got {err:?}");

	assert_empty_dir(&out);
	assert!(!dir.path().join("evil").exists());
	assert!(!out.join("evil").exists());
}

#[test]
fn lister_stops_when_metadata_does_not_authenticate() {
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("stop.slm");
	pack_archive(
		&archive,
		&[("first.txt", 0o644, b"one"), ("second.txt", 0o644, b"two")],
	);

	// break the first entry's metadata; the second is unreachable because
	// nothing trustworthy says how far to skip
	flip_byte(&archive, HEADER_SIZE + NONCE_SIZE + TAG_SIZE + 1);

	let listing = list_archive(&archive, PASSWORD).unwrap();
	assert_eq!(listing.failed, 1);
	assert!(listing.entries.is_empty());
}

#[test]
fn lister_skips_entries_with_invalid_but_authentic_metadata() {
	// entry 0 authenticates but violates size pairing; its declared payload
	// length is still trustworthy, so the lister can step over the junk
	// frame and reach entry 1
	let junk_payload_len = 33usize;
	let mut junk_frame = vec![0xA5u8; NONCE_SIZE + TAG_SIZE + junk_payload_len];
	junk_frame[0] = 0x01;

	let entries = [
		(
			plain_record(b"broken", junk_payload_len as u64, 0),
			junk_frame,
		),
		(plain_record(b"fine.txt", 0, 0), Vec::new()),
	];
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("skip.slm");
	let (bytes, _keys) = craft_archive(PASSWORD, 6, Compression::Lzma.as_u8(), &entries);
	fs::write(&archive, bytes).unwrap();

	let listing = list_archive(&archive, PASSWORD).unwrap();
	assert_eq!(listing.failed, 1);
	assert_eq!(listing.entries.len(), 1);
	assert_eq!(listing.entries[0].name, "fine.txt");
}

#[test]
fn metadata_sealed_under_the_wrong_domain_key_fails() {
	// domain separation: an entry sealed under the file key must not open
	// under the meta key
	let salt = [0x5Au8; SALT_SIZE];
	let keys = KeySchedule::derive(PASSWORD, &salt);

	let mut header = ArchiveHeader::new(Compression::Lzma, 1, 1);
	header.salt = salt;
	header.hmac = header.compute_hmac(&keys.file);

	let mut bytes = header.to_bytes().to_vec();
	let plain = plain_record(b"swapped", 0, 0);
	let mut nonce = [0u8; NONCE_SIZE];
	crypto::fill_random(&mut OsRng, &mut nonce).unwrap();
	let (ciphertext, tag) = crypto::aead_seal(&keys.file, &nonce, &plain).unwrap();
	bytes.extend_from_slice(&nonce);
	bytes.extend_from_slice(&tag);
	bytes.extend_from_slice(&ciphertext);

	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("swapped.slm");
	fs::write(&archive, bytes).unwrap();

	let mut decoder =
		Decoder::new(BufReader::new(fs::File::open(&archive).unwrap()), PASSWORD).unwrap();
	let err = decoder.next_entry().unwrap_err();
	assert!(matches!(err, Error::EntryAuth { index: 0 }), "got {err:?}");
}

// ── Legacy versions ──

#[test]
fn version_4_reads_as_lzma_whatever_the_algo_byte_says() {
	let data = b"legacy archive contents";
	let compressed = codec::compress(data, Compression::Lzma, 1).unwrap();

	let salt = [0x5Au8; SALT_SIZE];
	let keys = KeySchedule::derive(PASSWORD, &salt);

	let mut header = ArchiveHeader::new(Compression::Lzma, 1, 1);
	header.version = 4;
	header.algo = 0x63; // junk: v4 writers never stored an algorithm
	header.salt = salt;
	header.hmac = header.compute_hmac(&keys.file);

	let mut bytes = header.to_bytes().to_vec();
	let plain = FileEntryPlain::new("legacy.txt", compressed.len() as u64, data.len() as u64, 0o644)
		.unwrap()
		.to_bytes();
	let mut nonce = [0u8; NONCE_SIZE];
	crypto::fill_random(&mut OsRng, &mut nonce).unwrap();
	let (ciphertext, tag) = crypto::aead_seal(&keys.meta, &nonce, &plain).unwrap();
	bytes.extend_from_slice(&nonce);
	bytes.extend_from_slice(&tag);
	bytes.extend_from_slice(&ciphertext);

	let mut file_nonce = [0u8; NONCE_SIZE];
	crypto::fill_random(&mut OsRng, &mut file_nonce).unwrap();
	let (file_ct, file_tag) = crypto::aead_seal(&keys.file, &file_nonce, &compressed).unwrap();
	bytes.extend_from_slice(&file_nonce);
	bytes.extend_from_slice(&file_tag);
	bytes.extend_from_slice(&file_ct);

	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("v4.slm");
	fs::write(&archive, bytes).unwrap();

	let out = dir.path().join("out");
	fs::create_dir(&out).unwrap();
	let files = extract_into(&archive, PASSWORD, &out).unwrap();
	assert_eq!(files, 1);
	assert_eq!(fs::read(out.join("legacy.txt")).unwrap(), data);
}
