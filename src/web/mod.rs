pub mod api;

use std::sync::Arc;

use actix_web::{App, HttpServer, web::Data};
use tokio::task;

use crate::config::Config;
use crate::presence::PresenceEngine;

pub fn start(engine: Arc<PresenceEngine>, config: &Config) {
    let bind_addr = config.bind_addr.clone();
    let port = config.port;
    task::spawn_blocking(move || {
        println!("Starting web server on {}:{}", bind_addr, port);
        let sys = actix_rt::System::new();
        sys.block_on(async move {
            HttpServer::new(move || {
                App::new()
                    .app_data(Data::new(engine.clone()))
                    .service(api::index)
                    .service(api::get_leases)
                    .service(api::get_present_names)
                    .service(api::get_trackeds)
                    .service(api::get_tracked)
                    .service(api::create_tracked)
                    .service(api::rename_tracked)
                    .service(api::handle_name_form)
            })
            .bind((bind_addr, port))
            .unwrap()
            .run()
            .await
        })
        .expect("Failed to start Web server");
    });
}
