//! Idempotent DDL, applied in order at startup.

pub(super) const STATEMENTS: [&str; 9] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        phone TEXT,
        blood_group TEXT NOT NULL
            CHECK (blood_group IN ('A+', 'A-', 'B+', 'B-', 'AB+', 'AB-', 'O+', 'O-')),
        location TEXT,
        city TEXT,
        state TEXT,
        is_donor BOOLEAN NOT NULL DEFAULT FALSE,
        is_recipient BOOLEAN NOT NULL DEFAULT FALSE,
        last_donation_date DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blood_requests (
        id BIGSERIAL PRIMARY KEY,
        requester_id BIGINT REFERENCES users (id) ON DELETE SET NULL,
        patient_name TEXT NOT NULL,
        blood_group TEXT NOT NULL
            CHECK (blood_group IN ('A+', 'A-', 'B+', 'B-', 'AB+', 'AB-', 'O+', 'O-')),
        units_required INTEGER NOT NULL CHECK (units_required > 0),
        hospital_name TEXT,
        hospital_address TEXT,
        urgency_level TEXT NOT NULL DEFAULT 'Medium'
            CHECK (urgency_level IN ('Low', 'Medium', 'High', 'Emergency')),
        contact_person TEXT,
        contact_phone TEXT,
        reason TEXT,
        required_date DATE,
        status TEXT NOT NULL DEFAULT 'Pending'
            CHECK (status IN ('Pending', 'Approved', 'Fulfilled', 'Cancelled')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS donations (
        id BIGSERIAL PRIMARY KEY,
        donor_id BIGINT NOT NULL REFERENCES users (id),
        request_id BIGINT REFERENCES blood_requests (id) ON DELETE SET NULL,
        donation_date DATE NOT NULL,
        blood_group TEXT NOT NULL
            CHECK (blood_group IN ('A+', 'A-', 'B+', 'B-', 'AB+', 'AB-', 'O+', 'O-')),
        units_donated INTEGER NOT NULL CHECK (units_donated > 0),
        donation_center TEXT,
        notes TEXT,
        status TEXT NOT NULL DEFAULT 'Scheduled'
            CHECK (status IN ('Scheduled', 'Completed', 'Cancelled')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blood_inventory (
        blood_group TEXT PRIMARY KEY
            CHECK (blood_group IN ('A+', 'A-', 'B+', 'B-', 'AB+', 'AB-', 'O+', 'O-')),
        available_units INTEGER NOT NULL DEFAULT 0 CHECK (available_units >= 0),
        reserved_units INTEGER NOT NULL DEFAULT 0 CHECK (reserved_units >= 0),
        last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contact_messages (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT,
        message TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'Unread'
            CHECK (status IN ('Unread', 'Read', 'Replied')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_donations_donor ON donations (donor_id)",
    "CREATE INDEX IF NOT EXISTS idx_donations_group_status ON donations (blood_group, status)",
    "CREATE INDEX IF NOT EXISTS idx_requests_status ON blood_requests (status, blood_group)",
    "CREATE INDEX IF NOT EXISTS idx_contact_status ON contact_messages (status)",
];
