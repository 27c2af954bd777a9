use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

const TABLES: &[&str] = &[
    // Identity & orders
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        role TEXT NOT NULL DEFAULT 'customer',
        is_active BOOLEAN NOT NULL DEFAULT 1,
        is_email_verified BOOLEAN NOT NULL DEFAULT 0,
        last_login_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        order_number TEXT NOT NULL UNIQUE,
        user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        payment_method TEXT NOT NULL DEFAULT 'cod',
        payment_status TEXT NOT NULL DEFAULT 'unpaid',
        subtotal INTEGER NOT NULL DEFAULT 0,
        shipping_fee INTEGER NOT NULL DEFAULT 0,
        discount INTEGER NOT NULL DEFAULT 0,
        total INTEGER NOT NULL DEFAULT 0,
        coupon_code TEXT,
        recipient_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        address TEXT NOT NULL,
        ward_code TEXT,
        delivered_at TEXT,
        paid_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        product_id TEXT NOT NULL,
        product_name TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        unit_price INTEGER NOT NULL,
        flash_sale_item_id INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        notification_type TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        action_url TEXT,
        data TEXT NOT NULL DEFAULT '{}',
        is_read BOOLEAN NOT NULL DEFAULT 0,
        read_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    // Shipping
    r#"
    CREATE TABLE IF NOT EXISTS shipments (
        id TEXT PRIMARY KEY,
        order_id TEXT NOT NULL UNIQUE REFERENCES orders(id) ON DELETE CASCADE,
        provider TEXT NOT NULL DEFAULT 'ghn',
        tracking_code TEXT NOT NULL UNIQUE,
        provider_order_id TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        provider_status TEXT,
        weight INTEGER NOT NULL DEFAULT 500,
        dimensions TEXT,
        shipping_fee INTEGER NOT NULL DEFAULT 0,
        insurance_fee INTEGER NOT NULL DEFAULT 0,
        cod_fee INTEGER NOT NULL DEFAULT 0,
        total_fee INTEGER NOT NULL DEFAULT 0,
        cod_amount INTEGER NOT NULL DEFAULT 0,
        cod_collected BOOLEAN NOT NULL DEFAULT 0,
        cod_transferred BOOLEAN NOT NULL DEFAULT 0,
        cod_transfer_date TEXT,
        service_id INTEGER,
        service_type TEXT,
        expected_delivery TEXT,
        delivery_attempts INTEGER NOT NULL DEFAULT 0,
        max_delivery_attempts INTEGER NOT NULL DEFAULT 3,
        required_note TEXT NOT NULL DEFAULT 'CHOTHUHANG',
        note TEXT,
        picked_up_at TEXT,
        delivered_at TEXT,
        returned_at TEXT,
        cancelled_at TEXT,
        last_location TEXT,
        last_status_update TEXT,
        fail_reason TEXT,
        cancel_reason TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shipment_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        shipment_id TEXT NOT NULL REFERENCES shipments(id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        location TEXT,
        occurred_at TEXT NOT NULL,
        provider_data TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS delivery_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        shipment_id TEXT NOT NULL REFERENCES shipments(id) ON DELETE CASCADE,
        attempt_number INTEGER NOT NULL,
        attempted_at TEXT NOT NULL,
        fail_reason TEXT NOT NULL,
        notes TEXT,
        rescheduled_to TEXT,
        UNIQUE (shipment_id, attempt_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cod_reconciliations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        provider TEXT NOT NULL,
        reconciliation_date TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        total_orders INTEGER NOT NULL DEFAULT 0,
        total_cod INTEGER NOT NULL DEFAULT 0,
        total_shipping_fee INTEGER NOT NULL DEFAULT 0,
        net_amount INTEGER NOT NULL DEFAULT 0,
        transferred_at TEXT,
        transfer_reference TEXT,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (provider, reconciliation_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cod_reconciliation_shipments (
        reconciliation_id INTEGER NOT NULL REFERENCES cod_reconciliations(id) ON DELETE CASCADE,
        shipment_id TEXT NOT NULL REFERENCES shipments(id) ON DELETE CASCADE,
        PRIMARY KEY (reconciliation_id, shipment_id)
    )
    "#,
    // Marketing
    r#"
    CREATE TABLE IF NOT EXISTS coupons (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        discount_type TEXT NOT NULL DEFAULT 'percentage',
        discount_value INTEGER NOT NULL DEFAULT 0,
        min_order_value INTEGER NOT NULL DEFAULT 0,
        max_discount INTEGER,
        usage_limit INTEGER,
        usage_limit_per_user INTEGER NOT NULL DEFAULT 1,
        used_count INTEGER NOT NULL DEFAULT 0,
        valid_from TEXT NOT NULL,
        valid_until TEXT NOT NULL,
        apply_to TEXT NOT NULL DEFAULT 'all',
        first_order_only BOOLEAN NOT NULL DEFAULT 0,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        is_public BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS coupon_users (
        coupon_id INTEGER NOT NULL REFERENCES coupons(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        PRIMARY KEY (coupon_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS coupon_usages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        coupon_id INTEGER NOT NULL REFERENCES coupons(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        order_id TEXT,
        discount_amount INTEGER NOT NULL DEFAULT 0,
        used_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS banners (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        subtitle TEXT,
        image TEXT NOT NULL,
        image_mobile TEXT,
        link_url TEXT,
        link_text TEXT,
        position TEXT NOT NULL DEFAULT 'hero',
        category_id TEXT,
        start_date TEXT,
        end_date TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0,
        view_count INTEGER NOT NULL DEFAULT 0,
        click_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS flash_sales (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'scheduled',
        is_active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS flash_sale_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        flash_sale_id TEXT NOT NULL REFERENCES flash_sales(id) ON DELETE CASCADE,
        product_id TEXT NOT NULL,
        product_name TEXT NOT NULL DEFAULT '',
        flash_price INTEGER NOT NULL,
        original_price INTEGER NOT NULL,
        quantity_limit INTEGER NOT NULL DEFAULT 0,
        quantity_sold INTEGER NOT NULL DEFAULT 0,
        per_user_limit INTEGER NOT NULL DEFAULT 1,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS campaigns (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        campaign_type TEXT NOT NULL DEFAULT 'email',
        status TEXT NOT NULL DEFAULT 'draft',
        start_date TEXT,
        end_date TEXT,
        budget INTEGER NOT NULL DEFAULT 0,
        target_audience TEXT NOT NULL DEFAULT '{}',
        coupon_id INTEGER REFERENCES coupons(id) ON DELETE SET NULL,
        sent_count INTEGER NOT NULL DEFAULT 0,
        open_count INTEGER NOT NULL DEFAULT 0,
        click_count INTEGER NOT NULL DEFAULT 0,
        conversion_count INTEGER NOT NULL DEFAULT 0,
        revenue INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    // Reviews
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        product_id TEXT NOT NULL,
        order_id TEXT,
        rating INTEGER NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        comment TEXT NOT NULL DEFAULT '',
        quality_rating INTEGER,
        value_rating INTEGER,
        delivery_rating INTEGER,
        is_verified_purchase BOOLEAN NOT NULL DEFAULT 0,
        is_approved BOOLEAN NOT NULL DEFAULT 0,
        is_rejected BOOLEAN NOT NULL DEFAULT 0,
        rejection_reason TEXT,
        moderated_by TEXT,
        moderated_at TEXT,
        helpful_count INTEGER NOT NULL DEFAULT 0,
        not_helpful_count INTEGER NOT NULL DEFAULT 0,
        is_featured BOOLEAN NOT NULL DEFAULT 0,
        is_pinned BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (user_id, product_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS review_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
        image_url TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS review_replies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        content TEXT NOT NULL,
        is_official BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS review_votes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        is_helpful BOOLEAN NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (review_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS review_reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        reason TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'pending',
        resolved_by TEXT,
        resolved_at TEXT,
        resolution_note TEXT,
        created_at TEXT NOT NULL,
        UNIQUE (review_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS review_summaries (
        product_id TEXT PRIMARY KEY,
        total_reviews INTEGER NOT NULL DEFAULT 0,
        average_rating REAL NOT NULL DEFAULT 0,
        rating_1 INTEGER NOT NULL DEFAULT 0,
        rating_2 INTEGER NOT NULL DEFAULT 0,
        rating_3 INTEGER NOT NULL DEFAULT 0,
        rating_4 INTEGER NOT NULL DEFAULT 0,
        rating_5 INTEGER NOT NULL DEFAULT 0,
        avg_quality REAL,
        avg_value REAL,
        avg_delivery REAL,
        verified_count INTEGER NOT NULL DEFAULT 0,
        with_images_count INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL
    )
    "#,
    // Locations
    r#"
    CREATE TABLE IF NOT EXISTS provinces (
        code TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        name_with_type TEXT NOT NULL,
        slug TEXT NOT NULL,
        type TEXT NOT NULL DEFAULT '',
        search_slug TEXT NOT NULL DEFAULT '',
        ghn_id INTEGER,
        ghtk_id TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS districts (
        code TEXT PRIMARY KEY,
        province_code TEXT NOT NULL REFERENCES provinces(code) ON DELETE CASCADE,
        name TEXT NOT NULL,
        name_with_type TEXT NOT NULL,
        slug TEXT NOT NULL,
        type TEXT NOT NULL DEFAULT '',
        search_slug TEXT NOT NULL DEFAULT '',
        path TEXT NOT NULL DEFAULT '',
        path_with_type TEXT NOT NULL DEFAULT '',
        ghn_id INTEGER,
        ghtk_id TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wards (
        code TEXT PRIMARY KEY,
        district_code TEXT NOT NULL REFERENCES districts(code) ON DELETE CASCADE,
        name TEXT NOT NULL,
        name_with_type TEXT NOT NULL,
        slug TEXT NOT NULL,
        type TEXT NOT NULL DEFAULT '',
        search_slug TEXT NOT NULL DEFAULT '',
        path TEXT NOT NULL DEFAULT '',
        path_with_type TEXT NOT NULL DEFAULT '',
        ghn_code TEXT,
        ghtk_id TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1
    )
    "#,
    // Security
    r#"
    CREATE TABLE IF NOT EXISTS two_factor_configs (
        user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        is_enabled BOOLEAN NOT NULL DEFAULT 0,
        method TEXT NOT NULL DEFAULT 'totp',
        secret TEXT NOT NULL,
        backup_codes TEXT NOT NULL DEFAULT '[]',
        backup_codes_count INTEGER NOT NULL DEFAULT 0,
        last_used_at TEXT,
        setup_completed_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS login_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        user_id TEXT,
        ip_address TEXT NOT NULL,
        user_agent TEXT NOT NULL DEFAULT '',
        success BOOLEAN NOT NULL,
        failure_reason TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS account_lockouts (
        user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        locked_until TEXT NOT NULL,
        reason TEXT NOT NULL,
        failed_attempts INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS api_keys (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        key_prefix TEXT NOT NULL,
        key_hash TEXT NOT NULL UNIQUE,
        permission TEXT NOT NULL DEFAULT 'read',
        allowed_ips TEXT NOT NULL DEFAULT '[]',
        rate_limit INTEGER NOT NULL DEFAULT 1000,
        expires_at TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        usage_count INTEGER NOT NULL DEFAULT 0,
        last_used_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trusted_devices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        device_token TEXT NOT NULL UNIQUE,
        device_name TEXT NOT NULL DEFAULT '',
        ip_address TEXT NOT NULL DEFAULT '',
        trusted_until TEXT NOT NULL,
        last_used_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ip_blacklist (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ip_address TEXT NOT NULL UNIQUE,
        reason TEXT NOT NULL DEFAULT 'manual',
        description TEXT NOT NULL DEFAULT '',
        is_permanent BOOLEAN NOT NULL DEFAULT 0,
        blocked_until TEXT,
        block_count INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS security_audit_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT,
        event_type TEXT NOT NULL,
        severity TEXT NOT NULL DEFAULT 'info',
        ip_address TEXT NOT NULL DEFAULT '',
        user_agent TEXT NOT NULL DEFAULT '',
        details TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS csp_reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        document_uri TEXT NOT NULL DEFAULT '',
        violated_directive TEXT NOT NULL DEFAULT '',
        blocked_uri TEXT NOT NULL DEFAULT '',
        source_file TEXT,
        line_number INTEGER,
        raw_report TEXT NOT NULL DEFAULT '{}',
        ip_address TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    // Social login
    r#"
    CREATE TABLE IF NOT EXISTS oauth_provider_configs (
        provider TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        client_secret TEXT NOT NULL,
        scopes TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS social_connections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        provider TEXT NOT NULL,
        provider_user_id TEXT NOT NULL,
        email TEXT,
        name TEXT,
        avatar_url TEXT,
        access_token TEXT NOT NULL DEFAULT '',
        refresh_token TEXT,
        token_expires_at TEXT,
        is_primary BOOLEAN NOT NULL DEFAULT 0,
        last_login_at TEXT,
        extra_data TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (provider, provider_user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS oauth_states (
        state TEXT PRIMARY KEY,
        provider TEXT NOT NULL,
        user_id TEXT,
        redirect_uri TEXT NOT NULL,
        next_url TEXT NOT NULL DEFAULT '/',
        action TEXT NOT NULL DEFAULT 'login',
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS social_login_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT,
        provider TEXT NOT NULL,
        action TEXT NOT NULL,
        success BOOLEAN NOT NULL,
        error_message TEXT,
        ip_address TEXT NOT NULL DEFAULT '',
        user_agent TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_order_items_product ON order_items(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, is_read)",
    "CREATE INDEX IF NOT EXISTS idx_shipments_status ON shipments(status, provider)",
    "CREATE INDEX IF NOT EXISTS idx_shipment_events_shipment ON shipment_events(shipment_id, occurred_at)",
    "CREATE INDEX IF NOT EXISTS idx_coupon_usages_user ON coupon_usages(coupon_id, user_id)",
    "CREATE INDEX IF NOT EXISTS idx_flash_sale_items_product ON flash_sale_items(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_product ON reviews(product_id, is_approved)",
    "CREATE INDEX IF NOT EXISTS idx_districts_province ON districts(province_code)",
    "CREATE INDEX IF NOT EXISTS idx_wards_district ON wards(district_code)",
    "CREATE INDEX IF NOT EXISTS idx_login_attempts_email ON login_attempts(email, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_api_keys_prefix ON api_keys(key_prefix)",
    "CREATE INDEX IF NOT EXISTS idx_audit_user ON security_audit_logs(user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_social_user ON social_connections(user_id)",
];

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    for sql in TABLES.iter().chain(INDEXES) {
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }

    tracing::debug!("Schema up to date ({} tables)", TABLES.len());
    Ok(())
}
