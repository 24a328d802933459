//! Queue records and locations decoded from modem responses

use nimo_modem::core::message::decode_records;
use nimo_modem::{
    AtCommandTransport, AtOutcome, CoordinateResolution, DataFormat, Direction, GeoSatellite,
    GnssFixQuality, GnssFixType, Manufacturer, MessagePriority, MessageState, MockChannel,
    MoMessage, NmeaLocationDecoder, ValidationError,
};

const RMC: &str = "$GPRMC,005249.000,A,4517.1082,N,07550.9113,W,0.24,0.00,231123,,,A,V*0B";
const GGA: &str = "$GPGGA,005249.000,4517.1082,N,07550.9113,W,1,06,1.7,128.5,M,-34.3,M,,0000*62";
const GSA: &str = "$GPGSA,A,3,02,07,21,14,08,27,,,,,,,2.8,1.7,2.2,1*2D";

#[tokio::test(start_paused = true)]
async fn orbcomm_mo_states_from_modem() {
    let line = MockChannel::new(9600);
    line.expect(
        b"AT%MGRS\r",
        b"AT%MGRS\r\r\n%MGRS: \"12345678\",01.02,4,128,6,10,10\r\n\"HELLO\",01.03,4,200,4,2,0\r\n\r\nOK\r\n",
    );
    let mut at = AtCommandTransport::new(line);
    let profile = Manufacturer::Orbcomm.profile();

    let command = profile.command(profile.mo_states, None);
    let prefix = profile.prefix(profile.mo_states);
    let (outcome, response) = at.exchange(&command, Some(&prefix)).await.unwrap();
    assert_eq!(outcome, AtOutcome::Ok);

    let records = decode_records(&response, Direction::MobileOriginated, Manufacturer::Orbcomm);
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.name, "12345678");
    assert_eq!(first.sequence.as_deref(), Some("01.02"));
    assert_eq!(first.priority, MessagePriority::Low);
    assert_eq!(first.sin, 128);
    assert_eq!(first.state, MessageState::TxComplete);
    assert_eq!(first.length, 10);
    assert_eq!(first.bytes_delivered, 10);
    assert!(first.is_finished());

    let second = &records[1];
    assert_eq!(second.name, "HELLO");
    assert_eq!(second.sin, 200);
    assert_eq!(second.state, MessageState::TxReady);
    assert!(!second.is_finished());
}

#[tokio::test(start_paused = true)]
async fn quectel_states_from_modem() {
    let line = MockChannel::new(115_200);
    line.expect(
        b"AT+QSMGS\r",
        b"AT+QSMGS\r\r\n+QSMGS: \"123456789101\",4,128,6,10,10\r\n\r\nOK\r\n",
    );
    let mut at = AtCommandTransport::new(line);
    let profile = Manufacturer::Quectel.profile();

    let (outcome, response) = at
        .exchange(
            &profile.command(profile.mo_states, None),
            Some(&profile.prefix(profile.mo_states)),
        )
        .await
        .unwrap();
    assert_eq!(outcome, AtOutcome::Ok);

    let records = decode_records(&response, Direction::MobileOriginated, Manufacturer::Quectel);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "123456789101");
    assert_eq!(records[0].sequence, None);
    assert_eq!(records[0].priority, MessagePriority::Low);
    assert_eq!(records[0].state, MessageState::TxComplete);
    assert_eq!(records[0].bytes_delivered, 10);
}

#[test]
fn mt_states_both_manufacturers() {
    let orbcomm = decode_records(
        "\"FM01.01\",01.01,0,128,2,20,20",
        Direction::MobileTerminated,
        Manufacturer::Orbcomm,
    );
    let quectel = decode_records(
        "\"FM01.01\",0,128,2,20,20",
        Direction::MobileTerminated,
        Manufacturer::Quectel,
    );

    for records in [&orbcomm, &quectel] {
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name, "FM01.01");
        assert_eq!(record.direction, Direction::MobileTerminated);
        assert_eq!(record.priority, MessagePriority::None);
        assert_eq!(record.sin, 128);
        assert_eq!(record.state, MessageState::RxComplete);
        assert_eq!(record.length, 20);
        assert_eq!(record.bytes_delivered, 20);
    }
    assert_eq!(orbcomm[0].sequence.as_deref(), Some("01.01"));
}

#[tokio::test(start_paused = true)]
async fn mo_message_submitted() {
    let message = MoMessage::new(Manufacturer::Orbcomm, "hello", 128, 1, b"Hi")
        .unwrap()
        .with_priority(MessagePriority::Low)
        .unwrap()
        .with_format(DataFormat::Hex);
    let command = message.submit_command();
    assert_eq!(command, "AT%MGRT=\"hello\",4,128.1,2,4869");

    let line = MockChannel::new(9600);
    let framed = format!("{command}\r");
    let reply = format!("{framed}\r\nOK\r\n");
    line.expect(framed.as_bytes(), reply.as_bytes());
    let mut at = AtCommandTransport::new(line.clone());

    let (outcome, response) = at.exchange(&command, None).await.unwrap();
    assert_eq!(outcome, AtOutcome::Ok);
    assert_eq!(response, "");
    assert_eq!(line.remaining_expectations(), 0);
}

#[test]
fn mo_message_rejected_before_sending() {
    assert!(matches!(
        MoMessage::new(Manufacturer::Orbcomm, "toolongname", 128, 1, b""),
        Err(ValidationError::NameTooLong { max: 8, .. })
    ));
    assert!(MoMessage::new(Manufacturer::Quectel, "toolongname", 128, 1, b"").is_ok());
    assert!(matches!(
        MoMessage::new(Manufacturer::Orbcomm, "sys", 15, 1, b""),
        Err(ValidationError::InvalidSin(15))
    ));
    assert!(matches!(
        MoMessage::new(Manufacturer::Orbcomm, "big", 128, 1, &[0u8; 6399]),
        Err(ValidationError::TooLarge { size: 6401, .. })
    ));
}

#[test]
fn location_from_batch() {
    let location = NmeaLocationDecoder::new().decode_batch([RMC, GGA, GSA]);

    assert!(location.has_position());
    assert!((location.latitude - 45.01667).abs() < 1e-5);
    assert!((location.longitude + 75.08333).abs() < 1e-5);
    assert_eq!(location.altitude, 128.5);
    assert_eq!(location.timestamp, 1_700_700_769);
    assert_eq!(location.satellites, 6);
    assert_eq!(location.fix_type, GnssFixType::Fix3D);
    assert_eq!(location.fix_quality, GnssFixQuality::GpsSps);
    assert_eq!((location.pdop, location.hdop, location.vdop), (2.8, 1.7, 2.2));
    assert_eq!(location.closest_satellite(), Some(GeoSatellite::Amer));
}

#[tokio::test(start_paused = true)]
async fn location_from_modem() {
    let line = MockChannel::new(9600);
    let reply = format!("AT%GPS=15,14,\"RMC\",\"GGA\",\"GSA\"\r\r\n%GPS: {RMC}\r\n{GGA}\r\n{GSA}\r\n\r\nOK\r\n");
    line.expect(b"AT%GPS=15,14,\"RMC\",\"GGA\",\"GSA\"\r", reply.as_bytes());
    let mut at = AtCommandTransport::new(line);

    let (outcome, response) = at
        .exchange("AT%GPS=15,14,\"RMC\",\"GGA\",\"GSA\"", Some("%GPS:"))
        .await
        .unwrap();
    assert_eq!(outcome, AtOutcome::Ok);

    let decoder = NmeaLocationDecoder::new().resolution(CoordinateResolution::Full);
    let location = decoder.decode_text(&response);
    assert!((location.latitude - 45.285137).abs() < 1e-5);
    assert!((location.longitude + 75.848522).abs() < 1e-5);
    assert_eq!(location.time_iso(), "2023-11-23T00:52:49Z");

    let json: serde_json::Value = serde_json::from_str(&location.to_json().unwrap()).unwrap();
    assert_eq!(json["satellites"], 6);
}
