pub mod services {
    use btleplug::api::bleuuid::uuid_from_u16;
    use uuid::Uuid;

    /// Primary GATT service of the Bot.
    pub const BOT_SERVICE: Uuid = Uuid::from_u128(0xcba20d00_224d_11e6_9fb8_0002a5d5c51b);

    /// Service data UUIDs the Bot advertises its status under.
    pub const SERVICE_DATA_LEGACY: Uuid = uuid_from_u16(0x0d00);
    pub const SERVICE_DATA: Uuid = uuid_from_u16(0xfd3d);
}

pub mod characteristics {
    use uuid::Uuid;

    /// Write-only command characteristic.
    pub const COMMAND: Uuid = Uuid::from_u128(0xcba20002_224d_11e6_9fb8_0002a5d5c51b);
}

pub mod commands {
    pub const TURN_ON: [u8; 3] = [0x57, 0x01, 0x01];
    pub const TURN_OFF: [u8; 3] = [0x57, 0x01, 0x02];
}

/// Model byte a Bot carries in its advertisement.
pub const BOT_MODEL: u8 = b'H';

/// Battery level below which the battery is reported as low.
pub const LOW_BATTERY_THRESHOLD: u8 = 15;
