//! Mailbox configuration from a device tree.
//!
//! Blobs are assembled in memory by `DtbBuilder`, which emits just enough
//! of the flattened format (header, empty reservation map, structure and
//! strings blocks) for the parser.

use ns_mailbox::platform;
use ns_mailbox::MailboxConfig;

const FDT_BEGIN_NODE: u32 = 1;
const FDT_END_NODE: u32 = 2;
const FDT_PROP: u32 = 3;
const FDT_END: u32 = 9;

#[derive(Default)]
struct DtbBuilder {
    structs: Vec<u8>,
    strings: Vec<u8>,
}

impl DtbBuilder {
    fn token(&mut self, t: u32) {
        self.structs.extend_from_slice(&t.to_be_bytes());
    }

    fn pad(&mut self) {
        while self.structs.len() % 4 != 0 {
            self.structs.push(0);
        }
    }

    fn begin(&mut self, name: &str) -> &mut Self {
        self.token(FDT_BEGIN_NODE);
        self.structs.extend_from_slice(name.as_bytes());
        self.structs.push(0);
        self.pad();
        self
    }

    fn end(&mut self) -> &mut Self {
        self.token(FDT_END_NODE);
        self
    }

    fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let nameoff = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.token(FDT_PROP);
        self.structs.extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.structs.extend_from_slice(&nameoff.to_be_bytes());
        self.structs.extend_from_slice(value);
        self.pad();
        self
    }

    fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    fn prop_cells(&mut self, name: &str, cells: &[u32]) -> &mut Self {
        let bytes: Vec<u8> = cells.iter().flat_map(|c| c.to_be_bytes()).collect();
        self.prop(name, &bytes)
    }

    fn finish(&mut self) -> Vec<u8> {
        self.token(FDT_END);
        let header_len = 40;
        let rsvmap_len = 16;
        let off_struct = header_len + rsvmap_len;
        let off_strings = off_struct + self.structs.len();
        let mut total = off_strings + self.strings.len();
        total += (4 - total % 4) % 4;

        let mut blob = Vec::with_capacity(total);
        for word in [
            0xD00D_FEED,
            total as u32,
            off_struct as u32,
            off_strings as u32,
            header_len as u32,
            17,
            16,
            0,
            self.strings.len() as u32,
            self.structs.len() as u32,
        ] {
            blob.extend_from_slice(&u32::to_be_bytes(word));
        }
        blob.extend_from_slice(&[0u8; 16]);
        blob.extend_from_slice(&self.structs);
        blob.extend_from_slice(&self.strings);
        blob.resize(total, 0);
        blob
    }
}

/// Root node with 2/2 cells and the given children.
fn board(children: impl FnOnce(&mut DtbBuilder)) -> Vec<u8> {
    let mut b = DtbBuilder::default();
    b.begin("")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 2)
        .prop("compatible", b"linux,dummy-virt\0");
    children(&mut b);
    b.end();
    b.finish()
}

fn mailbox_node(b: &mut DtbBuilder) {
    b.begin("mailbox@e100000")
        .prop("compatible", b"arm,ns-mailbox\0")
        .prop_cells("reg", &[0, 0x0E10_0000, 0, 0x2000])
        .prop_u32("doorbell-sgi", 9)
        .prop_u32("peer-cpu", 2)
        .end();
}

fn uart_node(b: &mut DtbBuilder) {
    b.begin("pl011@9040000")
        .prop("compatible", b"arm,pl011\0arm,primecell\0")
        .prop_cells("reg", &[0, 0x0904_0000, 0, 0x1000])
        .end();
}

#[test]
fn mailbox_and_console_nodes_override_defaults() {
    let blob = board(|b| {
        mailbox_node(b);
        uart_node(b);
    });
    let config = MailboxConfig::from_dtb(&blob).expect("parsable blob");
    assert_eq!(
        config,
        MailboxConfig {
            queue_base: 0x0E10_0000,
            queue_size: 0x2000,
            doorbell_sgi: 9,
            peer_cpu: 2,
            uart_base: 0x0904_0000,
        }
    );
    assert!(config.fits_queue::<32>());
}

#[test]
fn missing_nodes_keep_platform_defaults() {
    let blob = board(uart_node);
    let config = MailboxConfig::from_dtb(&blob).expect("parsable blob");
    assert_eq!(config.queue_base, platform::MAILBOX_QUEUE_BASE);
    assert_eq!(config.queue_size, platform::MAILBOX_QUEUE_SIZE);
    assert_eq!(config.doorbell_sgi, platform::DOORBELL_SGI);
    assert_eq!(config.peer_cpu, platform::PEER_CPU);
    assert_eq!(config.uart_base, 0x0904_0000);
}

#[test]
fn out_of_range_sgi_is_ignored() {
    let blob = board(|b| {
        b.begin("mailbox@e000000")
            .prop("compatible", b"arm,ns-mailbox\0")
            .prop_u32("doorbell-sgi", 300)
            .end();
    });
    let config = MailboxConfig::from_dtb(&blob).expect("parsable blob");
    assert_eq!(config.doorbell_sgi, platform::DOORBELL_SGI);
}

#[test]
fn from_ptr_checks_magic_then_parses() {
    let blob = board(mailbox_node);
    // Word-aligned copy, as a boot loader would hand it over.
    let words: Vec<u32> = blob
        .chunks(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let config = unsafe { MailboxConfig::from_ptr(words.as_ptr() as usize) };
    assert_eq!(config.map(|c| c.doorbell_sgi), Some(9));

    let zeros = vec![0u32; 16];
    assert_eq!(unsafe { MailboxConfig::from_ptr(zeros.as_ptr() as usize) }, None);
}

#[test]
fn truncated_blob_is_rejected() {
    let blob = board(mailbox_node);
    assert!(MailboxConfig::from_dtb(&blob[..blob.len() / 2]).is_none());
}
