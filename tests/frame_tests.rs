mod common;

use rstest::*;

use dune_wib_compress::config::Identity;
use dune_wib_compress::wib::builder::running;
use dune_wib_compress::wib::{
    colddata, FrameReader, FrameState, InputWord, ReadStatus, WibFrameBuilder, DEFAULT_TICKS,
    FRAME_NWORDS, LINK_OFFSETS, USER_EOF_ERR, USER_SOF,
};
use dune_wib_compress::MODULE_NCHANNELS;

use crate::common::*;

fn reader() -> FrameReader {
    FrameReader::new(Identity::Fixed(TEST_WIB), DEFAULT_TICKS)
}

#[rstest]
#[case(true, false, FrameState::Normal)]
#[case(false, false, FrameState::RunDisabled)]
#[case(true, true, FrameState::Flush)]
#[case(false, true, FrameState::DisabledFlush)]
fn frame_state_follows_the_side_band(
    #[case] run_enable: bool,
    #[case] flush: bool,
    #[case] expected: FrameState,
) {
    let mut builder = WibFrameBuilder::new(TEST_WIB);
    builder.set_run_enable(run_enable);
    builder.set_flush(flush);
    let frame = reader().read(&builder.build(&[0x555; MODULE_NCHANNELS])).unwrap();
    assert_eq!(frame.state(), expected);
    assert_eq!(frame.state().is_normal(), expected == FrameState::Normal);
    assert_eq!(frame.status.header_errors(), 0);
}

/// A frame tampered with by `tamper` after a clean one, and the status bit it must raise.
#[rstest]
#[case::comma(|w: &mut [u64; FRAME_NWORDS]| w[0] ^= 0x01, ReadStatus::WIB_COMMA)]
#[case::version(|w: &mut [u64; FRAME_NWORDS]| w[0] ^= 1 << 8, ReadStatus::WIB_VERSION)]
#[case::identity(|w: &mut [u64; FRAME_NWORDS]| w[0] ^= 1 << 13, ReadStatus::WIB_ID)]
#[case::reserved(|w: &mut [u64; FRAME_NWORDS]| w[0] |= 1 << 60, ReadStatus::WIB_RESERVED)]
#[case::wib_errors(|w: &mut [u64; FRAME_NWORDS]| w[0] |= 1 << 40, ReadStatus::WIB_ERRORS)]
#[case::timestamp(|w: &mut [u64; FRAME_NWORDS]| w[1] += 1, ReadStatus::WIB_TIMESTAMP)]
#[case::stream_err(|w: &mut [u64; FRAME_NWORDS]| w[2] |= 1, ReadStatus::LINK_BASE[0] + ReadStatus::CD_STREAM_ERR1)]
#[case::convert_count(|w: &mut [u64; FRAME_NWORDS]| w[16] ^= 1 << 48, ReadStatus::LINK_BASE[1] + ReadStatus::CD_CONVERT_COUNT)]
#[case::err_reg(|w: &mut [u64; FRAME_NWORDS]| w[17] |= 1, ReadStatus::LINK_BASE[1] + ReadStatus::CD_ERR_REG)]
#[case::hdrs(|w: &mut [u64; FRAME_NWORDS]| w[3] ^= 1 << 40, ReadStatus::LINK_BASE[0] + ReadStatus::CD_HDRS)]
fn header_anomalies_are_flagged(#[case] tamper: fn(&mut [u64; FRAME_NWORDS]), #[case] bit: u32) {
    let mut builder = WibFrameBuilder::new(TEST_WIB);
    let mut reader = reader();
    let clean = reader.read(&builder.build(&[0x100; MODULE_NCHANNELS])).unwrap();
    assert_eq!(clean.status, ReadStatus::default());

    let mut words = builder.words(&[0x100; MODULE_NCHANNELS]);
    tamper(&mut words);
    let frame = reader.read(&running(&words)).unwrap();
    assert_eq!(frame.status.header_errors(), 1 << bit);
    assert!(frame.status.is_good_frame());
    assert_eq!(frame.state(), FrameState::Normal);
}

#[test]
fn checksums_are_not_checked() {
    let builder = WibFrameBuilder::new(TEST_WIB);
    let mut words = builder.words(&[0x100; MODULE_NCHANNELS]);
    words[LINK_OFFSETS[0]] |= colddata::header0(0xFFFF_FFFF, 0);
    let frame = reader().read(&running(&words)).unwrap();
    assert_eq!(frame.status, ReadStatus::default());
}

#[test]
fn framing_errors_are_flagged() {
    let builder = WibFrameBuilder::new(TEST_WIB);
    let words = builder.words(&[0x100; MODULE_NCHANNELS]);

    let mut input = running(&words);
    input[0].user = 0;
    input[7].user |= USER_SOF;
    input[12].last = true;
    input[FRAME_NWORDS - 1].last = false;
    input[FRAME_NWORDS - 1].user |= USER_EOF_ERR;
    let frame = reader().read(&input).unwrap();

    assert!(!frame.status.is_good_frame());
    assert_eq!(frame.status.frame_errors(), 0b11111);
    // no start of frame also means no run enable
    assert_eq!(frame.state(), FrameState::RunDisabled);
}

#[test]
fn the_adcs_come_back_out() {
    let (adcs, frames) = signal_frames(3, 4);
    let mut reader = reader();
    for (adcs, input) in adcs.iter().zip(&frames) {
        let frame = reader.read(input).unwrap();
        assert_eq!(&frame.adcs(), adcs);
        assert_eq!(frame.status, ReadStatus::default());
    }
    assert!(reader.read(&[InputWord::default(); FRAME_NWORDS + 1]).is_err());
}
