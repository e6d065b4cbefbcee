use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use slot_pool::PoolConfig;

#[derive(Debug)]
struct Connection {
    url: String,
}

fn main() {
    let mut index = 0;
    let pool = PoolConfig::<Connection>::new(move || {
        let url = format!("http://10.0.0.1/{}", index);
        index += 1;
        Connection { url }
    })
    .size(10)
    .acquire_timeout(Duration::from_millis(300))
    .build()
    .unwrap();

    let returning = Arc::new(Mutex::new(Vec::new()));

    let releaser = {
        let pool = pool.clone();
        let returning = returning.clone();
        thread::spawn(move || {
            for delay in [400, 100].iter() {
                thread::sleep(Duration::from_millis(*delay));
                let conn = returning.lock().unwrap().remove(0);
                pool.release(conn).unwrap();
            }
        })
    };

    for i in 0..12 {
        match pool.acquire().wait() {
            Ok(conn) => {
                println!("acquired {}", conn.url);
                if i < 2 {
                    returning.lock().unwrap().push(conn);
                }
            }
            Err(err) => println!("{}", err),
        }
    }

    releaser.join().unwrap();
    println!("{:?}", pool);
}
